//! Package metadata synthesis (`app.xml` / `meta.xml`).

use vc_forge_core::{ControllerProfile, GeneratedIds};

use crate::error::BuildError;

const OS_VERSION: &str = "000500101000400A";
const SDK_VERSION: u32 = 21204;

/// Everything the two metadata files need.
#[derive(Debug, Clone)]
pub struct MetaParams {
    pub ids: GeneratedIds,
    pub display_title: String,
    /// First four raw header bytes of the source image, hex-encoded.
    /// Carried in a reserved field so the source remains identifiable.
    pub raw_id_hex: String,
    pub profile: ControllerProfile,
}

impl MetaParams {
    pub fn new(
        ids: GeneratedIds,
        display_title: &str,
        raw_id_bytes: [u8; 4],
        profile: ControllerProfile,
    ) -> Result<Self, BuildError> {
        if display_title.trim().is_empty() {
            return Err(BuildError::MissingTitle);
        }
        let raw_id_hex = raw_id_bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<String>();
        Ok(Self {
            ids,
            display_title: display_title.trim().to_string(),
            raw_id_hex,
            profile,
        })
    }
}

/// Escape the five XML-significant characters.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_app_xml(params: &MetaParams) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<app type="complex" access="777">
  <version type="unsignedInt" length="4">16</version>
  <os_version type="hexBinary" length="8">{OS_VERSION}</os_version>
  <title_id type="hexBinary" length="8">{title_id}</title_id>
  <title_version type="hexBinary" length="2">0000</title_version>
  <sdk_version type="unsignedInt" length="4">{SDK_VERSION}</sdk_version>
  <app_type type="hexBinary" length="4">80000000</app_type>
  <group_id type="hexBinary" length="4">{group_id}</group_id>
</app>
"#,
        title_id = params.ids.package_id,
        group_id = params.ids.group_id(),
    )
}

/// Menu languages that carry a long and short name entry.
const NAME_LANGUAGES: [&str; 12] = [
    "ja", "en", "fr", "de", "it", "es", "zhs", "ko", "nl", "pt", "ru", "zht",
];

pub fn render_meta_xml(params: &MetaParams) -> String {
    let title = xml_escape(&params.display_title);
    let mut names = String::new();
    for lang in NAME_LANGUAGES {
        names.push_str(&format!(
            "  <longname_{lang} type=\"string\" length=\"512\">{title}</longname_{lang}>\n"
        ));
    }
    for lang in NAME_LANGUAGES {
        names.push_str(&format!(
            "  <shortname_{lang} type=\"string\" length=\"256\">{title}</shortname_{lang}>\n"
        ));
    }
    for lang in NAME_LANGUAGES {
        names.push_str(&format!(
            "  <publisher_{lang} type=\"string\" length=\"256\"></publisher_{lang}>\n"
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<menu type="complex" access="777">
  <version type="unsignedInt" length="4">33</version>
  <product_code type="string" length="32">WUP-N-{product_code}</product_code>
  <content_platform type="string" length="32">WUP</content_platform>
  <company_code type="string" length="8">0001</company_code>
  <mastering_date type="string" length="32"></mastering_date>
  <logo_type type="unsignedInt" length="4">0</logo_type>
  <app_launch_type type="hexBinary" length="4">00000000</app_launch_type>
  <invisible_flag type="hexBinary" length="4">00000000</invisible_flag>
  <no_managed_flag type="hexBinary" length="4">00000000</no_managed_flag>
  <no_event_log type="hexBinary" length="4">00000002</no_event_log>
  <no_icon_database type="hexBinary" length="4">00000000</no_icon_database>
  <launching_flag type="hexBinary" length="4">00000004</launching_flag>
  <install_flag type="hexBinary" length="4">00000000</install_flag>
  <closing_msg type="unsignedInt" length="4">0</closing_msg>
  <title_version type="unsignedInt" length="4">0</title_version>
  <title_id type="hexBinary" length="8">{title_id}</title_id>
  <group_id type="hexBinary" length="4">{group_id}</group_id>
  <boss_id type="hexBinary" length="8">0000000000000000</boss_id>
  <os_version type="hexBinary" length="8">{OS_VERSION}</os_version>
  <app_size type="hexBinary" length="8">0000000000000000</app_size>
  <common_save_size type="hexBinary" length="8">0000000000000000</common_save_size>
  <account_save_size type="hexBinary" length="8">0000000000100000</account_save_size>
  <common_boss_size type="hexBinary" length="8">0000000000000000</common_boss_size>
  <account_boss_size type="hexBinary" length="8">0000000000000000</account_boss_size>
  <save_no_rollback type="unsignedInt" length="4">0</save_no_rollback>
  <bg_daemon_enable type="unsignedInt" length="4">1</bg_daemon_enable>
  <olv_accesskey type="unsignedInt" length="4">3921400692</olv_accesskey>
  <wood_tin type="unsignedInt" length="4">0</wood_tin>
  <e_manual type="unsignedInt" length="4">0</e_manual>
  <e_manual_version type="unsignedInt" length="4">0</e_manual_version>
  <region type="hexBinary" length="4">FFFFFFFF</region>
  <pc_cero type="unsignedInt" length="4">128</pc_cero>
  <pc_esrb type="unsignedInt" length="4">128</pc_esrb>
  <pc_bbfc type="unsignedInt" length="4">192</pc_bbfc>
  <pc_usk type="unsignedInt" length="4">128</pc_usk>
  <pc_pegi_gen type="unsignedInt" length="4">128</pc_pegi_gen>
  <pc_pegi_fin type="unsignedInt" length="4">192</pc_pegi_fin>
  <pc_pegi_prt type="unsignedInt" length="4">128</pc_pegi_prt>
  <pc_pegi_bbfc type="unsignedInt" length="4">128</pc_pegi_bbfc>
  <pc_grb type="unsignedInt" length="4">128</pc_grb>
  <ext_dev_nunchaku type="unsignedInt" length="4">0</ext_dev_nunchaku>
  <ext_dev_classic type="unsignedInt" length="4">0</ext_dev_classic>
  <ext_dev_urcc type="unsignedInt" length="4">0</ext_dev_urcc>
  <ext_dev_board type="unsignedInt" length="4">0</ext_dev_board>
  <ext_dev_usb_keyboard type="unsignedInt" length="4">0</ext_dev_usb_keyboard>
  <eula_version type="unsignedInt" length="4">0</eula_version>
  <drc_use type="unsignedInt" length="4">{drc_use}</drc_use>
  <network_use type="unsignedInt" length="4">0</network_use>
  <online_account_use type="unsignedInt" length="4">0</online_account_use>
  <direct_boot type="unsignedInt" length="4">0</direct_boot>
  <reserved_flag0 type="hexBinary" length="4">00000000</reserved_flag0>
  <reserved_flag1 type="hexBinary" length="4">00000000</reserved_flag1>
  <reserved_flag2 type="hexBinary" length="4">{raw_id_hex}</reserved_flag2>
  <reserved_flag3 type="hexBinary" length="4">00000000</reserved_flag3>
  <reserved_flag4 type="hexBinary" length="4">00000000</reserved_flag4>
  <reserved_flag5 type="hexBinary" length="4">00000000</reserved_flag5>
  <reserved_flag6 type="hexBinary" length="4">00000003</reserved_flag6>
  <reserved_flag7 type="hexBinary" length="4">00000005</reserved_flag7>
{names}</menu>
"#,
        product_code = params.ids.product_code,
        title_id = params.ids.package_id,
        group_id = params.ids.group_id(),
        drc_use = params.profile.drc_use(),
        raw_id_hex = params.raw_id_hex,
        names = names,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_forge_core::IdMinter;

    fn params(profile: ControllerProfile) -> MetaParams {
        let mut minter = IdMinter::with_seed(7);
        MetaParams::new(minter.mint(), "Mario & Sonic <Test>", *b"RMCE", profile).unwrap()
    }

    #[test]
    fn app_xml_carries_the_minted_ids() {
        let p = params(ControllerProfile::GamepadCc);
        let xml = render_app_xml(&p);
        assert!(xml.contains(&p.ids.package_id));
        assert!(xml.contains(&p.ids.group_id()));
    }

    #[test]
    fn meta_xml_escapes_the_title() {
        let xml = render_meta_xml(&params(ControllerProfile::GamepadCc));
        assert!(xml.contains("Mario &amp; Sonic &lt;Test&gt;"));
        assert!(!xml.contains("Mario & Sonic <Test>"));
    }

    #[test]
    fn meta_xml_has_all_name_languages() {
        let xml = render_meta_xml(&params(ControllerProfile::GamepadCc));
        for lang in NAME_LANGUAGES {
            assert!(xml.contains(&format!("<longname_{lang} ")), "{lang} missing");
            assert!(xml.contains(&format!("<shortname_{lang} ")), "{lang} missing");
        }
    }

    #[test]
    fn drc_use_follows_the_profile() {
        let with_pad = render_meta_xml(&params(ControllerProfile::GamepadCc));
        assert!(with_pad.contains(">65537</drc_use>"));
        let without = render_meta_xml(&params(ControllerProfile::NoGamepad));
        assert!(without.contains(">1</drc_use>"));
    }

    #[test]
    fn reserved_field_carries_the_source_header_bytes() {
        let xml = render_meta_xml(&params(ControllerProfile::GamepadCc));
        // "RMCE" as hex
        assert!(xml.contains(">524D4345</reserved_flag2>"));
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut minter = IdMinter::with_seed(7);
        let err = MetaParams::new(
            minter.mint(),
            "   ",
            *b"RMCE",
            ControllerProfile::GamepadCc,
        );
        assert!(matches!(err, Err(BuildError::MissingTitle)));
    }
}

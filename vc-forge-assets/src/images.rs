//! Derives the three package images from a single cover.
//!
//! The Wii U menu expects fixed-size TGA textures: a 128x128 32-bit
//! icon, a 1280x720 24-bit TV banner, and an 854x480 24-bit GamePad
//! screen. All three are derived from one piece of cover art.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::AssetError;

pub const ICON_SIZE: u32 = 128;
pub const TV_WIDTH: u32 = 1280;
pub const TV_HEIGHT: u32 = 720;
pub const DRC_WIDTH: u32 = 854;
pub const DRC_HEIGHT: u32 = 480;

pub const ICON_FILE: &str = "iconTex.tga";
pub const TV_FILE: &str = "bootTvTex.tga";
pub const DRC_FILE: &str = "bootDrcTex.tga";

/// The three menu textures derived from one cover image.
pub struct DerivedImages {
    /// 128x128, kept as RGBA (written as a 32bpp TGA).
    pub icon: DynamicImage,
    /// 1280x720 RGB (24bpp TGA).
    pub tv: DynamicImage,
    /// 854x480 RGB (24bpp TGA).
    pub drc: DynamicImage,
}

impl DerivedImages {
    /// Write all three textures into a directory under their menu names.
    pub fn write_all(&self, dir: &Path) -> Result<(), AssetError> {
        std::fs::create_dir_all(dir)?;
        write_tga(&self.icon, &dir.join(ICON_FILE))?;
        write_tga(&self.tv, &dir.join(TV_FILE))?;
        write_tga(&self.drc, &dir.join(DRC_FILE))?;
        Ok(())
    }
}

/// Derive icon, TV, and GamePad textures from a cover image.
///
/// The icon is cut from the top of the cover (squared off horizontally
/// around the center) so box art keeps its title band; the two screens
/// are stretched to their exact display sizes.
pub fn derive_images(cover: &DynamicImage) -> DerivedImages {
    let (width, height) = cover.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let icon_src = cover.crop_imm(x, 0, side, side);

    DerivedImages {
        icon: DynamicImage::ImageRgba8(
            icon_src
                .resize_exact(ICON_SIZE, ICON_SIZE, FilterType::Lanczos3)
                .to_rgba8(),
        ),
        tv: DynamicImage::ImageRgb8(
            cover
                .resize_exact(TV_WIDTH, TV_HEIGHT, FilterType::Lanczos3)
                .to_rgb8(),
        ),
        drc: DynamicImage::ImageRgb8(
            cover
                .resize_exact(DRC_WIDTH, DRC_HEIGHT, FilterType::Lanczos3)
                .to_rgb8(),
        ),
    }
}

/// Write an image as TGA. RGBA input produces a 32bpp file, RGB a
/// 24bpp one, which is exactly the split the menu textures need.
pub fn write_tga(img: &DynamicImage, path: &Path) -> Result<(), AssetError> {
    img.save_with_format(path, image::ImageFormat::Tga)?;
    Ok(())
}

/// A flat placeholder cover for when no artwork can be found.
pub fn placeholder_cover() -> DynamicImage {
    let pixel = image::Rgb([0x2e_u8, 0x34_u8, 0x40_u8]);
    DynamicImage::ImageRgb8(image::RgbImage::from_pixel(TV_WIDTH, TV_HEIGHT, pixel))
}

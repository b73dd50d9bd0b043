//! 位图裁剪与编码（纯函数，不依赖任何平台能力）

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};

use super::error::CaptureError;

/// 裁剪位图；请求区域超出图片时取交集
pub fn crop_region(
    image: &RgbaImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<RgbaImage, CaptureError> {
    let (img_width, img_height) = image.dimensions();
    let x = x.min(img_width);
    let y = y.min(img_height);
    let width = width.min(img_width - x);
    let height = height.min(img_height - y);

    if width == 0 || height == 0 {
        return Err(CaptureError::CaptureFailed(format!(
            "裁剪区域 ({},{}) 超出采集图像 {}x{}",
            x, y, img_width, img_height
        )));
    }

    Ok(imageops::crop_imm(image, x, y, width, height).to_image())
}

/// 缩放到目标像素尺寸，尺寸一致时原样返回
pub fn fit_to_size(image: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image;
    }
    log::debug!(
        "📸 采集图像 {}x{} 缩放到 {}x{}",
        image.width(),
        image.height(),
        width,
        height
    );
    imageops::resize(&image, width, height, FilterType::Triangle)
}

/// 编码为 PNG 字节
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(png)
}

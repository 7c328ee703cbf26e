use qrcode::QrCode;
use qrcode::render::svg;

use crate::error::AppError;

/// Render `data` as an SVG QR code.
pub fn svg_for(data: &str) -> Result<String, AppError> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encode error: {e}")))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(250, 250)
        .build())
}

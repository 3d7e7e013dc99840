use crate::error::ApiError;

/// Largest master volume a client may ask for.
pub const MAX_VOLUME: f32 = 1.0;

/// Volume must be a finite number in `[0, MAX_VOLUME]`.
pub fn validate_volume(volume: f32) -> Result<f32, ApiError> {
    if !volume.is_finite() || !(0.0..=MAX_VOLUME).contains(&volume) {
        return Err(ApiError::InvalidInput(format!(
            "Volume must be between 0 and {MAX_VOLUME}, got {volume}"
        )));
    }
    Ok(volume)
}

/// Reject empty or oversized base64 speech payloads before decoding.
pub fn validate_audio_payload(audio_base64: &str, max_bytes: usize) -> Result<(), ApiError> {
    let trimmed = audio_base64.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput("audio_base64 cannot be empty".to_string()));
    }
    // 4 base64 characters carry 3 bytes
    let decoded_estimate = trimmed.len() / 4 * 3;
    if decoded_estimate > max_bytes {
        return Err(ApiError::InvalidInput(format!(
            "Audio payload too large (max {max_bytes} bytes)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_volume() {
        assert_eq!(validate_volume(0.0).unwrap(), 0.0);
        assert_eq!(validate_volume(0.25).unwrap(), 0.25);
        assert!(validate_volume(1.0).is_ok());
        assert!(validate_volume(-0.1).is_err());
        assert!(validate_volume(1.5).is_err());
        assert!(validate_volume(f32::NAN).is_err());
    }

    #[test]
    fn test_validate_audio_payload() {
        assert!(validate_audio_payload("AAAA", 1024).is_ok());
        let result = validate_audio_payload("   ", 1024);
        if let Err(ApiError::InvalidInput(msg)) = result {
            assert!(msg.contains("empty"));
        } else {
            panic!("expected InvalidInput");
        }
        let big = "A".repeat(4_000);
        assert!(validate_audio_payload(&big, 1_000).is_err());
    }
}

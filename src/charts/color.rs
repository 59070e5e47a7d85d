//! Stable per-song chart colors.

/// Deterministic hue for a song uri: a rolling multiply-add hash over
/// the uri bytes, modulo 360. Independent of song order and shared by
/// the streams and rank charts, so a song keeps its color across
/// sessions and views.
pub fn color_for_uri(uri: &str) -> String {
    let mut hash: u32 = 0;
    for byte in uri.bytes() {
        hash = (hash * 31 + byte as u32) % 360;
    }
    format!("hsl({}, 75%, 58%)", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_a_pure_function_of_uri() {
        let a = color_for_uri("spotify:track:abc");
        let b = color_for_uri("spotify:track:abc");
        assert_eq!(a, b);
    }

    #[test]
    fn test_color_has_hsl_shape() {
        let color = color_for_uri("spotify:track:abc");
        assert!(color.starts_with("hsl("));
        assert!(color.ends_with(", 75%, 58%)"));
    }

    #[test]
    fn test_different_uris_usually_differ() {
        // Not guaranteed in general (the hue space is 360 wide), but
        // these two must not collide or the charts become unreadable.
        assert_ne!(color_for_uri("spotify:track:abc"), color_for_uri("spotify:track:abd"));
    }
}

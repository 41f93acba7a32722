// src/utils/html.rs

/// Sanitizes post HTML coming from the rich-text editor.
///
/// Whitelist-based: formatting tags (<b>, <p>, <img>, links) survive, while
/// <script>, <iframe> and event-handler attributes are stripped together
/// with their content. Comments are plain text and do not go through here.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_and_handlers() {
        let dirty = r#"<p onclick="steal()">gg <b>wp</b></p><script>alert(1)</script>"#;
        assert_eq!(clean_html(dirty), "<p>gg <b>wp</b></p>");
    }
}

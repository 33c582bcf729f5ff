//! Page-context script for filtered text extraction.
//!
//! The script hides the tool's own UI overlay before reading user-visible
//! text, then restores each element's original inline visibility. The restore
//! lives in a `finally` block so it runs even when reading throws partway;
//! the page must never be left with the overlay hidden.

/// Label prefixed to the collected image alt texts.
pub const ALT_TEXT_LABEL: &str = "Other Alt Texts in the page: ";

/// Build the page-evaluated expression that returns body text plus alt texts.
///
/// `overlay_selectors` is embedded as a JSON array, so arbitrary selector
/// strings are safe to pass through.
pub fn filtered_text_script(overlay_selectors: &[String]) -> String {
    let selectors =
        serde_json::to_string(overlay_selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
  const selectorsToFilter = {selectors};
  const hidden = [];
  try {{
    selectorsToFilter.forEach((selector) => {{
      document.querySelectorAll(selector).forEach((element) => {{
        hidden.push({{ element: element, visibility: element.style.visibility }});
        element.style.visibility = "hidden";
      }});
    }});

    const textContent =
      (document.body && document.body.innerText) ||
      (document.documentElement && document.documentElement.innerText) ||
      "";

    const altTexts = Array.from(document.querySelectorAll("img")).map((img) => img.alt);
    return textContent + " " + {label} + altTexts.join(" ");
  }} finally {{
    hidden.forEach((entry) => {{
      entry.element.style.visibility = entry.visibility;
    }});
  }}
}})()"#,
        selectors = selectors,
        label = serde_json::to_string(ALT_TEXT_LABEL).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_script() -> String {
        filtered_text_script(&["#agente-overlay".to_string()])
    }

    #[test]
    fn script_embeds_overlay_selectors() {
        let script = filtered_text_script(&[
            "#agente-overlay".to_string(),
            ".scout-banner".to_string(),
        ]);
        assert!(script.contains(r##"["#agente-overlay",".scout-banner"]"##));
    }

    #[test]
    fn script_restores_visibility_on_all_paths() {
        let script = default_script();
        let finally_at = script.find("finally").expect("finally block");
        let restore_at = script
            .find("entry.element.style.visibility = entry.visibility")
            .expect("restore statement");
        assert!(
            restore_at > finally_at,
            "visibility restore must sit in the finally block"
        );
    }

    #[test]
    fn script_reads_body_with_root_fallback() {
        let script = default_script();
        assert!(script.contains("document.body && document.body.innerText"));
        assert!(script.contains("document.documentElement && document.documentElement.innerText"));
    }

    #[test]
    fn script_labels_alt_texts() {
        let script = default_script();
        assert!(script.contains("Other Alt Texts in the page: "));
        assert!(script.contains(r#"querySelectorAll("img")"#));
    }

    #[test]
    fn selectors_are_json_escaped() {
        let script = filtered_text_script(&["div[data-x=\"y\"]".to_string()]);
        assert!(script.contains(r#"["div[data-x=\"y\"]"]"#));
    }
}

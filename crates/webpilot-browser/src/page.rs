//! Scripts evaluated inside the page.

use serde::Deserialize;
use webpilot_agent::environment::InteractiveElement;

/// Characters of body text returned by a scan.
pub const TEXT_PREVIEW_CHARS: usize = 2000;

/// Characters kept per element label.
pub const ELEMENT_TEXT_CHARS: usize = 150;

/// Result of [`scan_script`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PageScan {
    #[serde(default)]
    pub text_preview: String,
    #[serde(default)]
    pub elements: Vec<InteractiveElement>,
}

/// Tag every visible interactive element with `data-ai-id="ai-id-N"` and
/// collect a text preview, in one round trip.
///
/// Old tags are cleared first so ids always describe the current page.
pub fn scan_script() -> String {
    format!(
        r#"(() => {{
  document.querySelectorAll('[data-ai-id]').forEach(el => el.removeAttribute('data-ai-id'));
  const candidates = document.querySelectorAll(
    'a, button, input:not([type="hidden"]), textarea, select, [role="button"], [onclick], [tabindex="0"]'
  );
  const elements = [];
  let counter = 0;
  candidates.forEach(el => {{
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return;
    if (el.disabled || el.offsetParent === null) return;
    const rect = el.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) return;
    const id = `ai-id-${{counter++}}`;
    el.setAttribute('data-ai-id', id);
    const label = el.innerText || el.textContent || el.value || el.placeholder
      || el.getAttribute('aria-label') || el.title || '';
    elements.push({{
      id,
      tag: el.tagName.toLowerCase(),
      kind: (typeof el.type === 'string' && el.type) || el.getAttribute('role') || el.tagName.toLowerCase(),
      text: label.replace(/\s+/g, ' ').trim().substring(0, {ELEMENT_TEXT_CHARS}),
    }});
  }});
  let text = '';
  if (document.body) {{
    const clone = document.body.cloneNode(true);
    clone.querySelectorAll('script, style, noscript').forEach(el => el.remove());
    text = (document.body.innerText || clone.textContent || '').trim().substring(0, {TEXT_PREVIEW_CHARS});
  }}
  return {{ text_preview: text, elements }};
}})()"#
    )
}

/// Selectors tried in order when looking for a popup's close button.
pub const POPUP_CLOSE_SELECTORS: &[&str] = &[
    "[aria-label=\"Close\"]",
    "[aria-label=\"close\"]",
    "button[class*=\"close\"]",
    "div[class*=\"close\"]",
    "[id*=\"close\"]",
];

/// Button captions that dismiss cookie and sign-up dialogs.
pub const POPUP_DISMISS_LABELS: &[&str] = &["Accept", "Accept all", "No, thanks", "Хорошо", "Принять все"];

/// Click the first visible popup close control. Evaluates to a description
/// of what was clicked, or an empty string when nothing matched.
pub fn close_popup_script() -> String {
    let selectors = serde_json::to_string(POPUP_CLOSE_SELECTORS).unwrap_or_else(|_| "[]".into());
    let labels = serde_json::to_string(POPUP_DISMISS_LABELS).unwrap_or_else(|_| "[]".into());
    format!(
        r#"(() => {{
  const visible = el => {{
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';
  }};
  for (const sel of {selectors}) {{
    const el = Array.from(document.querySelectorAll(sel)).find(visible);
    if (el) {{ el.click(); return sel; }}
  }}
  const buttons = Array.from(document.querySelectorAll('button'));
  for (const label of {labels}) {{
    const el = buttons.find(b => visible(b) && (b.innerText || '').trim() === label);
    if (el) {{ el.click(); return `button "${{label}}"`; }}
  }}
  return '';
}})()"#
    )
}

/// Clear an input before typing into it.
pub fn clear_value_script(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "''".into());
    format!(
        "(() => {{ const el = document.querySelector({selector}); \
         if (el && 'value' in el) {{ el.value = ''; }} return true; }})()"
    )
}

/// Scroll the window; `pixels` is ignored for top and bottom.
pub fn scroll_script(direction: crate::actions::ScrollDirection, pixels: u64) -> String {
    use crate::actions::ScrollDirection;
    let body = match direction {
        ScrollDirection::Down => format!("window.scrollBy(0, {pixels})"),
        ScrollDirection::Up => format!("window.scrollBy(0, -{pixels})"),
        ScrollDirection::Top => "window.scrollTo(0, 0)".to_string(),
        ScrollDirection::Bottom => "window.scrollTo(0, document.body.scrollHeight)".to_string(),
    };
    format!("(() => {{ {body}; return true; }})()")
}

//! Generates the stylesheet the host injects for drag feedback and hover
//! colors. Pure string assembly; the host owns the style element.

use crate::host::HostAdapter;
use crate::model::settings::ArrangeSettings;

pub fn stylesheet(settings: &ArrangeSettings) -> String {
    let drag = &settings.drag_drop_color;
    let hover = &settings.hover_color;
    format!(
        r#".nav-file.sortable-drag,
.nav-folder.sortable-drag,
.nav-file.sortable-chosen,
.nav-folder.sortable-chosen {{
    background-color: {drag} !important;
    color: var(--text-on-accent) !important;
    opacity: 1 !important;
    border-radius: 4px;
    box-shadow: 0 2px 5px rgba(0, 0, 0, 0.2) !important;
}}

.nav-file-title:hover,
.nav-folder-title:hover {{
    background-color: {hover} !important;
}}

.nav-file-title,
.nav-folder-title {{
    transition: background-color 0.1s ease-out;
}}

body.is-dragging .nav-file-title:hover,
body.is-dragging .nav-folder-title:hover {{
    background-color: inherit !important;
}}
"#
    )
}

/// Regenerates and pushes the stylesheet; called at startup and whenever a
/// color setting changes.
pub fn apply(host: &mut dyn HostAdapter, settings: &ArrangeSettings) {
    host.apply_stylesheet(&stylesheet(settings));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;

    #[test]
    fn stylesheet_carries_both_configured_colors() {
        let mut settings = ArrangeSettings::default();
        settings.drag_drop_color = "#123456".to_string();
        settings.hover_color = "#ABCDEF".to_string();
        let css = stylesheet(&settings);
        assert!(css.contains("background-color: #123456 !important"));
        assert!(css.contains("background-color: #ABCDEF !important"));
    }

    #[test]
    fn apply_hands_the_sheet_to_the_host() {
        let mut host = MemoryHost::default();
        apply(&mut host, &ArrangeSettings::default());
        let sheet = host.stylesheet.as_deref().unwrap_or_default();
        assert!(sheet.contains("#7F50E0"));
        assert!(sheet.contains("#E0E0E0"));
    }
}

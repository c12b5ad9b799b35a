//! HTML widgets for form fields, rendered per mode.
//!
//! In interactive modes a widget renders an input element whose id and name
//! are the stable field id; in VIEW mode it renders the value as plain
//! marked-up text with no input at all.

use crate::template::escape_attribute;
use formentry_types::Mode;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Text { size: Option<u32> },
    Number,
    Date,
    Checkbox { value: String },
    Select { options: Vec<SelectOption> },
}

impl Widget {
    /// Renders the widget markup for a field.
    ///
    /// `initial` is the pre-population value: the stored submission value
    /// for interactive modes, the display value for VIEW.
    pub fn render(&self, field_id: &str, mode: Mode, initial: Option<&str>) -> String {
        if mode == Mode::View {
            return self.render_view(initial);
        }
        match self {
            Widget::Text { size } => {
                let size_attr = size
                    .map(|s| format!(" size=\"{s}\""))
                    .unwrap_or_default();
                format!(
                    "<input type=\"text\" id=\"{id}\" name=\"{id}\"{size_attr} value=\"{value}\"/>",
                    id = field_id,
                    value = escape_attribute(initial.unwrap_or(""))
                )
            }
            Widget::Number => format!(
                "<input type=\"text\" class=\"numberField\" id=\"{id}\" name=\"{id}\" value=\"{value}\"/>",
                id = field_id,
                value = escape_attribute(initial.unwrap_or(""))
            ),
            Widget::Date => format!(
                "<input type=\"date\" id=\"{id}\" name=\"{id}\" value=\"{value}\"/>",
                id = field_id,
                value = escape_attribute(initial.unwrap_or(""))
            ),
            Widget::Checkbox { value } => {
                let checked = if initial.is_some() { " checked=\"checked\"" } else { "" };
                format!(
                    "<input type=\"checkbox\" id=\"{id}\" name=\"{id}\" value=\"{value}\"{checked}/>",
                    id = field_id,
                    value = escape_attribute(value)
                )
            }
            Widget::Select { options } => {
                let mut out = format!("<select id=\"{id}\" name=\"{id}\">", id = field_id);
                out.push_str("<option value=\"\"></option>");
                for option in options {
                    let selected = if initial == Some(option.value.as_str()) {
                        " selected=\"selected\""
                    } else {
                        ""
                    };
                    out.push_str(&format!(
                        "<option value=\"{value}\"{selected}>{label}</option>",
                        value = escape_attribute(&option.value),
                        label = escape_attribute(&option.label)
                    ));
                }
                out.push_str("</select>");
                out
            }
        }
    }

    fn render_view(&self, initial: Option<&str>) -> String {
        let display = match self {
            // Show the answer label, not its stored value.
            Widget::Select { options } => initial.map(|value| {
                options
                    .iter()
                    .find(|o| o.value == value)
                    .map(|o| o.label.clone())
                    .unwrap_or_else(|| value.to_owned())
            }),
            _ => initial.map(str::to_owned),
        };
        match display.filter(|d| !d.is_empty()) {
            Some(d) => format!("<span class=\"value\">{}</span>", escape_attribute(&d)),
            None => "<span class=\"emptyValue\">____</span>".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_input_carries_stable_id_and_name() {
        let html = Widget::Text { size: Some(10) }.render("w3", Mode::Enter, None);
        assert_eq!(
            html,
            "<input type=\"text\" id=\"w3\" name=\"w3\" size=\"10\" value=\"\"/>"
        );
    }

    #[test]
    fn test_edit_mode_prepopulates_the_value() {
        let html = Widget::Number.render("w1", Mode::Edit, Some("70"));
        assert!(html.contains("value=\"70\""));
    }

    #[test]
    fn test_view_mode_renders_no_input() {
        let html = Widget::Number.render("w1", Mode::View, Some("70"));
        assert_eq!(html, "<span class=\"value\">70</span>");
        assert!(!html.contains("<input"));
    }

    #[test]
    fn test_view_mode_shows_placeholder_when_empty() {
        let html = Widget::Date.render("w1", Mode::View, None);
        assert_eq!(html, "<span class=\"emptyValue\">____</span>");
    }

    #[test]
    fn test_select_marks_the_initial_option() {
        let widget = Widget::Select {
            options: vec![
                SelectOption { value: "1".into(), label: "Yes".into() },
                SelectOption { value: "2".into(), label: "No".into() },
            ],
        };
        let html = widget.render("w2", Mode::Edit, Some("2"));
        assert!(html.contains("<option value=\"2\" selected=\"selected\">No</option>"));
        assert!(html.contains("<option value=\"\"></option>"));
    }

    #[test]
    fn test_select_view_shows_the_answer_label() {
        let widget = Widget::Select {
            options: vec![SelectOption { value: "1".into(), label: "Yes".into() }],
        };
        assert_eq!(
            widget.render("w2", Mode::View, Some("1")),
            "<span class=\"value\">Yes</span>"
        );
    }

    #[test]
    fn test_checkbox_checked_state_follows_initial() {
        let widget = Widget::Checkbox { value: "true".into() };
        assert!(widget
            .render("w4", Mode::Edit, Some("true"))
            .contains("checked=\"checked\""));
        assert!(!widget.render("w4", Mode::Enter, None).contains("checked"));
    }
}

use crate::types::ParkingType;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const RESULT_TEMPLATE: &str = include_str!("../../templates/result.html");
const ERROR_TEMPLATE: &str = include_str!("../../templates/error.html");

/// The input form, with one `<option>` per trained parking category.
pub fn index() -> String {
    let options: Vec<String> = ParkingType::KNOWN
        .iter()
        .map(|p| format!("        <option value=\"{0}\">{0}</option>", p.label()))
        .collect();
    INDEX_TEMPLATE.replace("{{ charger_options }}", &options.join("\n"))
}

/// `output` is an already formatted number, so it goes in unescaped.
pub fn result(output: &str) -> String {
    RESULT_TEMPLATE.replace("{{ output }}", output)
}

/// Error page; `message` may echo user input and is escaped.
pub fn error(message: &str) -> String {
    ERROR_TEMPLATE.replace("{{ message }}", &escape(message))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub const DEVICE_PLACEHOLDER: &str = "{device}";

/// MQTT filter matching: `+` is one level, a trailing `#` is any remainder
/// (including none).
pub fn matches_filter(filter: &str, topic: &str) -> bool {
    let filter_segments: Vec<&str> = filter.split('/').collect();
    let topic_segments: Vec<&str> = topic.split('/').collect();

    let mut idx = 0;
    while idx < filter_segments.len() {
        match filter_segments[idx] {
            "#" => return idx == filter_segments.len() - 1,
            "+" => {
                if idx >= topic_segments.len() {
                    return false;
                }
            }
            segment => {
                if topic_segments.get(idx) != Some(&segment) {
                    return false;
                }
            }
        }
        idx += 1;
    }

    idx == topic_segments.len()
}

/// Fills the `{device}` placeholder with the last level of the source topic.
pub fn output_topic(template: &str, source_topic: &str) -> String {
    if !template.contains(DEVICE_PLACEHOLDER) {
        return template.to_string();
    }
    let device = source_topic.rsplit('/').next().unwrap_or(source_topic);
    template.replace(DEVICE_PLACEHOLDER, device)
}

// Path layout and header names of the plugin command API

pub const DEFAULT_PLUGIN_ID: &str = "neptune3_lightcontrol";
pub const API_KEY_HEADER: &str = "X-Api-Key";

pub fn plugin_api_path(plugin_id: &str) -> String {
    format!("/api/plugin/{}", plugin_id)
}

// Route pattern used by the server router
pub fn plugin_api_route() -> &'static str { "/api/plugin/:plugin_id" }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_path_embeds_identifier() {
        assert_eq!(plugin_api_path(DEFAULT_PLUGIN_ID), "/api/plugin/neptune3_lightcontrol");
    }
}

//! HTML views over the device configuration.
//!
//! A single editable form mirroring the five stored fields, plus the
//! confirmation page shown before the post-save reboot. Field names are
//! the short ones the save endpoint expects (`s`,`p`,`h`,`o`,`n`).

use crate::config::DeviceConfig;

const HEAD: &str = "<!DOCTYPE html><html><head><meta charset='utf-8'>\
<title>Zero2 Node</title>\
<style>body{font-family:Arial;margin:20px;}input{width:260px;}</style>\
</head><body>";

const FOOT: &str = "<p><a href=\"/update\">OTA Update</a></p></body></html>";

/// Render the configuration form with the current values filled in.
///
/// The Wi-Fi secret is shown in clear; the portal is only reachable from
/// the owner's network or the fallback AP.
pub fn index_page(config: &DeviceConfig) -> String {
    format!(
        "{head}<h2>Config</h2><form action=\"/save\" method=\"post\">\
         SSID:<br><input name=\"s\" value=\"{s}\"><br>\
         Password:<br><input name=\"p\" value=\"{p}\"><br>\
         MQTT host:<br><input name=\"h\" value=\"{h}\"><br>\
         MQTT port:<br><input name=\"o\" type=\"number\" value=\"{o}\"><br>\
         Station name:<br><input name=\"n\" value=\"{n}\"><br><br>\
         <input type=\"submit\" value=\"Save &amp; Reboot\"></form>{foot}",
        head = HEAD,
        s = escape(config.network_name()),
        p = escape(config.network_secret()),
        h = escape(config.broker_host()),
        o = config.broker_port(),
        n = escape(config.device_name()),
        foot = FOOT,
    )
}

/// Confirmation page sent right before the reboot.
pub fn saved_page() -> &'static str {
    "<!DOCTYPE html><html><body><h3>Saved! Rebooting…</h3></body></html>"
}

/// Escape a value for embedding in a double-quoted HTML attribute.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

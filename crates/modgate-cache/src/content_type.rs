const JSON: &str = "application/json; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";
const ZIP: &str = "application/zip";
const OCTET_STREAM: &str = "application/octet-stream";

/// Infer the content type of a protocol object from the shape of its name.
pub fn content_type(name: &str) -> &'static str {
    if name.ends_with(".info") || name.ends_with("/@latest") {
        return JSON;
    }
    if name.ends_with(".mod") || name.ends_with("/@v/list") {
        return TEXT;
    }
    if name.ends_with(".zip") {
        return ZIP;
    }
    if let Some(rest) = name.strip_prefix("sumdb/") {
        // sumdb/<host>/<kind>/...
        if matches!(rest.split('/').nth(1), Some("latest" | "lookup")) {
            return TEXT;
        }
    }
    OCTET_STREAM
}

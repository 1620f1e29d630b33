use crate::result::SearchResult;

const CSV_HEADER: &str = "source,username,url,category,found,status,responseTime,nsfw";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render results as CSV for download. Rows end with CRLF.
pub fn export_csv(results: &[SearchResult]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + results.len() * 96);
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");
    for r in results {
        let row = [
            csv_field(&r.source),
            csv_field(&r.username),
            csv_field(&r.url),
            csv_field(&r.category),
            r.is_found().to_string(),
            r.check_result.status.to_string(),
            r.response_time().to_string(),
            r.is_nsfw.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

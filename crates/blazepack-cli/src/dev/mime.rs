//! Extension-based content classification.

/// Lower-cased extension of the last path segment, if any.
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() && !name[1..].contains('.') {
        // dotfile such as `.npmrc`
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type for files that must travel as base64 data URLs.
///
/// Returns `None` for text files, which are sent as UTF-8.
pub fn binary_mime(path: &str) -> Option<&'static str> {
    let mime = match extension(path)?.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/vnd.microsoft.icon",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "aac" => "audio/aac",
        "mid" => "audio/midi",
        "midi" => "audio/x-midi",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "mpeg" => "video/mpeg",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        "zip" => "application/zip",
        "glb" => "model/gltf-binary",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

/// Content-Type header value for serving `path`.
pub fn content_type(path: &str) -> &'static str {
    if let Some(mime) = binary_mime(path) {
        return mime;
    }

    match extension(path).as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") | Some("cjs") => "text/javascript",
        Some("css") => "text/css",
        Some("json") | Some("map") => "application/json",
        Some("jsonld") => "application/ld+json",
        Some("geojson") => "application/geo+json",
        Some("gltf") => "model/gltf+json",
        Some("svg") => "image/svg+xml",
        Some("csv") => "text/csv",
        Some("md") => "text/markdown",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(extension("/src/App.js").as_deref(), Some("js"));
        assert_eq!(extension("/logo.PNG").as_deref(), Some("png"));
        assert_eq!(extension("/archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension("/about"), None);
        assert_eq!(extension("/.npmrc"), None);
        assert_eq!(extension("/.env.local").as_deref(), Some("local"));
    }

    #[test]
    fn test_images_are_binary() {
        assert_eq!(binary_mime("/logo.png"), Some("image/png"));
        assert_eq!(binary_mime("/photo.jpg"), Some("image/jpeg"));
        assert_eq!(binary_mime("/font.woff2"), Some("font/woff2"));
    }

    #[test]
    fn test_text_is_not_binary() {
        assert_eq!(binary_mime("/src/App.js"), None);
        assert_eq!(binary_mime("/logo.svg"), None);
        assert_eq!(binary_mime("/README"), None);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("/index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type("/static/js/main.js"), "text/javascript");
        assert_eq!(content_type("/logo.svg"), "image/svg+xml");
        assert_eq!(content_type("/logo.png"), "image/png");
        assert_eq!(content_type("/blob"), "application/octet-stream");
    }
}

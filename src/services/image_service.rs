/// Turns stored `(disk, path)` pairs into public URLs. Storage itself is
/// handled elsewhere; this only resolves already-stored files.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    storage_url: String,
}

impl ImageUrls {
    pub fn new(storage_url: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, disk: &str, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        match disk {
            "public" | "" => format!("{}/{}", self.storage_url, path),
            other => format!("{}/{}/{}", self.storage_url, other, path),
        }
    }
}

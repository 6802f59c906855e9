//! Hand-built `multipart/form-data` bodies for HTTP tests.

/// Builder for a multipart body with a fixed boundary.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: &'static str,
    body: Vec<u8>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// Empty body.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            boundary: "lovebrew-test-boundary",
            body: Vec::new(),
        }
    }

    /// Append a file part.
    #[must_use]
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        let headers = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n",
            self.boundary
        );
        self.body.extend_from_slice(headers.as_bytes());
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Value for the `Content-Type` request header.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Terminate the body and return its bytes.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

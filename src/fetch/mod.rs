//! Report download and decoding.
//!
//! Both steps report failure as `None`: the pipeline classifies an absent
//! result, it never sees a transport or codec error.

pub mod http;

use std::io::Read;

use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::error::Result;

/// Status code and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Blocking HTTP GET.
///
/// Implementations must return `Ok` for every response that arrived,
/// whatever its status; `Err` is reserved for transport failures.
pub trait HttpFetch {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Download `url`. Only HTTP 200 counts as success.
pub fn fetch(http: &dyn HttpFetch, url: &str) -> Option<Vec<u8>> {
    match http.get(url) {
        Ok(response) if response.status == 200 => {
            debug!(url = url, bytes = response.body.len(), "Downloaded report");
            Some(response.body)
        }
        Ok(response) => {
            warn!(url = url, status = response.status, "Report download refused");
            None
        }
        Err(e) => {
            warn!(url = url, error = %e, "Report download failed");
            None
        }
    }
}

/// Gunzip `data` and decode it as text.
///
/// A UTF-8 or UTF-16 byte order mark selects the encoding; otherwise the
/// payload must be valid UTF-8.
pub fn decompress(data: &[u8]) -> Option<String> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    if let Err(e) = decoder.read_to_end(&mut decompressed) {
        warn!(error = %e, bytes = data.len(), "Failed to decompress gzip data");
        return None;
    }
    debug!("Decompressed {} -> {} bytes", data.len(), decompressed.len());

    let encoding = encoding_rs::Encoding::for_bom(&decompressed)
        .map(|(encoding, _)| encoding)
        .unwrap_or(encoding_rs::UTF_8);
    let (text, malformed) = encoding.decode_with_bom_removal(&decompressed);
    if malformed {
        warn!(encoding = encoding.name(), "Decompressed report is not valid text");
        return None;
    }
    Some(text.into_owned())
}

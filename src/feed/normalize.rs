// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use url::Url;

const DROPBOX_MARKER: &str = "dropbox.com";
const DROPBOX_SHARE_HOST: &str = "www.dropbox.com";
const DROPBOX_DIRECT_HOST: &str = "dl.dropboxusercontent.com";
const DRIVE_MARKER: &str = "drive.google.com";

/// Turn a file-sharing link into a URL that serves the file bytes directly.
///
/// Dropbox share links are moved to the content host and lose their `dl`
/// parameter; Google Drive links become `uc?export=download` links. Anything
/// else, and anything that cannot be understood, is returned unchanged.
pub fn normalize(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    if url.contains(DROPBOX_MARKER) {
        return normalize_dropbox(url).unwrap_or_else(|| url.to_string());
    }

    if url.contains(DRIVE_MARKER) {
        return match drive_file_id(url) {
            Some(id) => format!("https://{DRIVE_MARKER}/uc?export=download&id={id}"),
            None => {
                tracing::warn!(url, "Could not find a file id in Google Drive link");
                url.to_string()
            }
        };
    }

    url.to_string()
}

fn normalize_dropbox(url: &str) -> Option<String> {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(url, error = %e, "Could not parse Dropbox link");
            return None;
        }
    };

    if parsed.host_str() == Some(DROPBOX_SHARE_HOST) {
        parsed.set_host(Some(DROPBOX_DIRECT_HOST)).ok()?;
    }

    // Keep the raw parameters (rlkey, st, ...) in their original order and encoding.
    let kept: Vec<String> = parsed
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|param| !param.is_empty() && param.split('=').next() != Some("dl"))
        .map(str::to_string)
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.set_query(Some(&kept.join("&")));
    }

    Some(parsed.into())
}

/// Extract the file id from `/file/d/{id}/...` or, failing that, an `id=` parameter
fn drive_file_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    let from_path = parsed.path_segments().and_then(|segments| {
        let segments: Vec<&str> = segments.collect();
        segments
            .windows(3)
            .find(|window| window[0] == "file" && window[1] == "d" && !window[2].is_empty())
            .map(|window| window[2].to_string())
    });

    from_path.or_else(|| {
        parsed
            .query_pairs()
            .find(|(key, value)| key == "id" && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    })
}

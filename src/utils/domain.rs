// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! URL helpers used by the policy lookups and the warning page reply.

use url::Url;

use crate::engine_core::constants::display;

/// Hostname of `raw`, or `None` when it is not an absolute URL with a host.
pub fn extract_domain(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()?
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Shorten a URL for display by keeping its head and tail around an ellipsis.
pub fn truncate_url(raw: Option<&str>, max_len: usize) -> String {
    let Some(url) = raw.filter(|u| !u.is_empty()) else {
        return display::UNKNOWN_URL.to_string();
    };

    let chars: Vec<char> = url.chars().collect();
    if chars.len() <= max_len {
        return url.to_string();
    }

    let half = max_len / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{}…{}", head, tail)
}

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

//! Host Channel Codec.
//!
//! Newline-delimited JSON framing. The decoder yields raw lines and leaves
//! JSON parsing to the reader pipeline, so a malformed message never tears
//! down the channel. Only an oversized frame is a decoding error.

use crate::engine_core::constants::limits;
use anyhow::{anyhow, Result};
use bytes::BytesMut;
use serde::Serialize;
use std::cmp;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

pub struct HostCodec {
    // Bytes already scanned for a newline
    next_index: usize,
    max_length: usize,
}

impl HostCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(limits::MAX_MESSAGE_SIZE_BYTES)
    }

    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
        }
    }
}

impl Default for HostCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn strip_cr(line: &mut BytesMut) {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
}

impl Decoder for HostCodec {
    type Item = BytesMut;
    type Error = anyhow::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let read_to = cmp::min(self.max_length.saturating_add(1), src.len());
            let newline = src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match newline {
                Some(offset) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let mut line = src.split_to(end + 1);
                    line.truncate(end);
                    strip_cr(&mut line);

                    if is_blank(&line) {
                        continue;
                    }
                    trace!("Decoded frame of {} bytes", line.len());
                    return Ok(Some(line));
                }
                None if src.len() > self.max_length => {
                    return Err(anyhow!(
                        "Message exceeds max size of {} bytes",
                        self.max_length
                    ));
                }
                None => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        // Final line without a terminator
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let mut line = src.split_to(src.len());
        strip_cr(&mut line);
        if is_blank(&line) {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

impl<'a, T> Encoder<&'a T> for HostCodec
where
    T: Serialize + ?Sized,
{
    type Error = anyhow::Error;

    fn encode(&mut self, item: &'a T, dst: &mut BytesMut) -> Result<()> {
        let body = serde_json::to_vec(item)?;
        dst.reserve(body.len() + 1);
        dst.extend_from_slice(&body);
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}

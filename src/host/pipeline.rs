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

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, warn};

use crate::host::codec::HostCodec;
use crate::host::messages::HostMessage;

/// Messages arriving from the host
#[derive(Debug)]
pub enum HostEvent {
    Message(HostMessage),
    /// Frame that is not a valid host message; the channel stays open
    Malformed(String),
    /// Host closed its end (EOF) or the frame stream broke
    Disconnect,
}

/// Spawns a background task decoding host frames into `HostEvent`s
pub fn spawn_host_reader<R>(stream: R, tx: mpsc::Sender<HostEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut framed = FramedRead::new(stream, HostCodec::new());

        while let Some(result) = framed.next().await {
            let event = match result {
                Ok(line) => match serde_json::from_slice::<HostMessage>(&line) {
                    Ok(msg) => HostEvent::Message(msg),
                    Err(e) => {
                        warn!(error = %e, "Host message parse error");
                        HostEvent::Malformed(e.to_string())
                    }
                },
                Err(e) => {
                    error!(error = %e, "Host framing error");
                    let _ = tx.send(HostEvent::Malformed(e.to_string())).await;
                    break;
                }
            };

            if tx.send(event).await.is_err() {
                debug!("Host event receiver dropped");
                return;
            }
        }

        let _ = tx.send(HostEvent::Disconnect).await;
    })
}

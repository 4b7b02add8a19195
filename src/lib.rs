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

//! llm-warden: policy enforcement agent for LLM destinations.
//!
//! This library reconciles a centrally published list of LLM domains with
//! local override policies, installs the result as declarative filter rules
//! in a host evaluator, records every rule match as an enforcement event and
//! ships buffered events to a remote log collector.

pub mod agent;
pub mod config;
pub mod engine;
pub mod engine_core;
pub mod host;
pub mod loader;
pub mod net;
pub mod store;
pub mod utils;

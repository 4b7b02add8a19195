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

//! Declarative rule format.
//!
//! Translates reconciled `Rule`s into the host's declarative filter format
//! (`||domain^` URL filters, allow/block/redirect actions) and back.

use serde::{Deserialize, Serialize};

use crate::engine_core::constants::rules;
use crate::engine_core::errors::AgentError;
use crate::engine_core::models::{Policy, Rule, RuleId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarativeRule {
    pub id: RuleId,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Block,
    Redirect { redirect: Redirect },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub extension_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<String>,
}

/// `||domain^`: the domain and all of its subdomains
pub fn url_filter_for(domain: &str) -> String {
    format!(
        "{}{}{}",
        rules::URL_FILTER_PREFIX,
        domain,
        rules::URL_FILTER_SUFFIX
    )
}

pub fn compile(rule: &Rule) -> DeclarativeRule {
    let action = match rule.action {
        Policy::Allow => RuleAction::Allow,
        Policy::Block => RuleAction::Block,
        Policy::Warn => RuleAction::Redirect {
            redirect: Redirect {
                extension_path: rules::WARNING_PAGE_PATH.to_string(),
            },
        },
    };

    DeclarativeRule {
        id: rule.id,
        priority: rule.priority,
        action,
        condition: RuleCondition {
            url_filter: url_filter_for(&rule.domain),
            resource_types: rules::RESOURCE_TYPES.iter().map(|t| t.to_string()).collect(),
        },
    }
}

pub fn decompile(rule: &DeclarativeRule) -> Result<Rule, AgentError> {
    let domain = rule
        .condition
        .url_filter
        .strip_prefix(rules::URL_FILTER_PREFIX)
        .and_then(|rest| rest.strip_suffix(rules::URL_FILTER_SUFFIX))
        .filter(|domain| !domain.is_empty())
        .ok_or_else(|| {
            AgentError::ApplyFailed(format!(
                "Rule {} has unsupported url filter '{}'",
                rule.id, rule.condition.url_filter
            ))
        })?;

    let action = match rule.action {
        RuleAction::Allow => Policy::Allow,
        RuleAction::Block => Policy::Block,
        RuleAction::Redirect { .. } => Policy::Warn,
    };

    Ok(Rule {
        id: rule.id,
        priority: rule.priority,
        domain: domain.to_string(),
        action,
    })
}

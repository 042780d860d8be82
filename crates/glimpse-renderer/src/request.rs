//! Typesetting requests and their cache identity.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::tracker::Ticket;

/// One math expression to typeset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderRequest {
    pub expression_text: String,
    pub display_mode: bool,
}

impl RenderRequest {
    pub fn new(expression_text: impl Into<String>, display_mode: bool) -> Self {
        Self {
            expression_text: expression_text.into(),
            display_mode,
        }
    }

    pub fn display(expression_text: impl Into<String>) -> Self {
        Self::new(expression_text, true)
    }

    pub fn inline(expression_text: impl Into<String>) -> Self {
        Self::new(expression_text, false)
    }

    /// The cache key. Text is taken verbatim: `a+b` and `a + b` are different entries.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            tex: self.expression_text.clone(),
            display_mode: self.display_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    tex: String,
    display_mode: bool,
}

impl Fingerprint {
    pub fn tex(&self) -> &str {
        &self.tex
    }

    pub fn display_mode(&self) -> bool {
        self.display_mode
    }
}

/// What the delegated renderer receives: `{ "id", "tex", "displayMode" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateRequest {
    pub id: SmolStr,
    pub tex: String,
    pub display_mode: bool,
}

impl DelegateRequest {
    pub fn new(id: SmolStr, request: &RenderRequest) -> Self {
        Self {
            id,
            tex: request.expression_text.clone(),
            display_mode: request.display_mode,
        }
    }
}

/// A display-math region emitted by a render pass and not yet resolved.
///
/// Holds the tracker ticket taken when its placeholder was emitted; whoever
/// consumes it must end that ticket exactly once.
#[derive(Debug)]
pub struct PendingResolution {
    pub id: SmolStr,
    pub request: RenderRequest,
    pub ticket: Ticket,
}

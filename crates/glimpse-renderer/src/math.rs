//! Inline math, typeset on the spot to MathML.

use pulldown_latex::config::{DisplayMode, RenderConfig};
use pulldown_latex::{Parser, Storage, mathml::push_mathml};

use crate::error::TypesetError;

/// Typeset inline `tex` to a `<math>` element.
///
/// The whole expression is parsed before anything is written, so a parse
/// error anywhere rejects it instead of producing partial MathML.
pub fn typeset_inline(tex: &str) -> Result<String, TypesetError> {
    let storage = Storage::new();
    let events: Vec<_> = Parser::new(tex, &storage).collect();
    if let Some(err) = events.iter().find_map(|event| event.as_ref().err()) {
        return Err(TypesetError::Parse(err.to_string()));
    }

    let config = RenderConfig {
        display_mode: DisplayMode::Inline,
        ..Default::default()
    };
    let mut mathml = String::with_capacity(tex.len() * 8);
    push_mathml(&mut mathml, events.into_iter(), config)
        .map_err(|e| TypesetError::Write(e.to_string()))?;
    Ok(mathml)
}

//! Positions, messages and tokens
//!
//! These are small immutable records, so they are copied into plain host
//! values on conversion and hold no runtime reference afterwards.

use std::fmt;

use kson_bridge::{BridgeResult, Env, FromEmbedded, JValue, LocalRef, ToEmbedded};

use crate::access::{to_int, unsigned};
use crate::descriptors as d;
use crate::enums::{MessageSeverity, TokenType};

/// Zero-based line and column in a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    line: usize,
    column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.line, self.column)
    }
}

impl FromEmbedded for Position {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        let env = obj.env();
        let line = env.call_int(&d::POSITION_GET_LINE, obj.as_raw(), &[])?;
        let column = env.call_int(&d::POSITION_GET_COLUMN, obj.as_raw(), &[])?;
        Ok(Position {
            line: unsigned(line, &d::POSITION_GET_LINE)?,
            column: unsigned(column, &d::POSITION_GET_COLUMN)?,
        })
    }
}

impl ToEmbedded for Position {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        let line = to_int(self.line, &d::POSITION_NEW)?;
        let column = to_int(self.column, &d::POSITION_NEW)?;
        env.new_object(&d::POSITION_NEW, &[JValue::Int(line), JValue::Int(column)])
    }
}

/// Diagnostic attached to a source range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    message: String,
    severity: MessageSeverity,
    start: Position,
    end: Position,
}

impl Message {
    pub fn new(message: impl Into<String>, severity: MessageSeverity, start: Position, end: Position) -> Self {
        Message {
            message: message.into(),
            severity,
            start,
            end,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> MessageSeverity {
        self.severity
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }
}

/// `start to end - message`, e.g. `0,5 to 0,16 - Unclosed list`
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {} - {}", self.start, self.end, self.message)
    }
}

impl FromEmbedded for Message {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        let env = obj.env();
        let this = obj.as_raw();
        Ok(Message {
            message: String::from_embedded(env.call_object(&d::MESSAGE_GET_MESSAGE, this, &[])?)?,
            severity: MessageSeverity::from_embedded(env.call_object(&d::MESSAGE_GET_SEVERITY, this, &[])?)?,
            start: Position::from_embedded(env.call_object(&d::MESSAGE_GET_START, this, &[])?)?,
            end: Position::from_embedded(env.call_object(&d::MESSAGE_GET_END, this, &[])?)?,
        })
    }
}

impl ToEmbedded for Message {
    fn to_embedded<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        let message = self.message.to_embedded(env)?;
        let severity = self.severity.to_embedded(env)?;
        let start = self.start.to_embedded(env)?;
        let end = self.end.to_embedded(env)?;
        env.new_object(
            &d::MESSAGE_NEW,
            &[message.as_arg(), severity.as_arg(), start.as_arg(), end.as_arg()],
        )
    }
}

/// Lexical token produced by [`crate::Kson::analyze`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    token_type: TokenType,
    text: String,
    start: Position,
    end: Position,
}

impl Token {
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }
}

impl FromEmbedded for Token {
    fn from_embedded(obj: LocalRef<'_>) -> BridgeResult<Self> {
        let env = obj.env();
        let this = obj.as_raw();
        Ok(Token {
            token_type: TokenType::from_embedded(env.call_object(&d::TOKEN_GET_TOKEN_TYPE, this, &[])?)?,
            text: String::from_embedded(env.call_object(&d::TOKEN_GET_TEXT, this, &[])?)?,
            start: Position::from_embedded(env.call_object(&d::TOKEN_GET_START, this, &[])?)?,
            end: Position::from_embedded(env.call_object(&d::TOKEN_GET_END, this, &[])?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::model;
    use kson_bridge::BridgeError;

    #[test]
    fn test_message_display() {
        let message = Message::new(
            "Unclosed list",
            MessageSeverity::Error,
            Position::new(0, 5),
            Position::new(0, 16),
        );
        assert_eq!(message.to_string(), "0,5 to 0,16 - Unclosed list");
    }

    #[test]
    fn test_message_through_runtime() {
        let (fake, runtime) = model();
        let original = Message::new(
            "Expected ':'",
            MessageSeverity::Warning,
            Position::new(2, 0),
            Position::new(2, 7),
        );
        let copied = runtime
            .with_attachment(|env| Message::from_embedded(original.to_embedded(env)?))
            .unwrap();
        assert_eq!(copied, original);
        assert_eq!(fake.stats().live_locals, 0);
        assert_eq!(runtime.pinned_references(), 0);
    }

    #[test]
    fn test_negative_position_rejected() {
        let (_fake, runtime) = model();
        let result = runtime.with_attachment(|env| {
            let position = env.new_object(&d::POSITION_NEW, &[JValue::Int(-1), JValue::Int(0)])?;
            Position::from_embedded(position)
        });
        assert!(matches!(
            result,
            Err(BridgeError::NativeInvocation { message, .. }) if message == "negative value -1"
        ));
    }

    #[test]
    fn test_position_beyond_int_rejected() {
        let (fake, runtime) = model();
        let line = i32::MAX as usize + 1;
        let result = runtime.with_attachment(|env| Position::new(line, 0).to_embedded(env).map(|_| ()));
        assert!(matches!(
            result,
            Err(BridgeError::NativeInvocation { message, .. }) if message == format!("{} does not fit an int", line)
        ));
        assert_eq!(fake.stats().live_locals, 0);

        let widest = runtime
            .with_attachment(|env| Position::from_embedded(Position::new(i32::MAX as usize, 0).to_embedded(env)?))
            .unwrap();
        assert_eq!(widest.line(), i32::MAX as usize);
    }
}

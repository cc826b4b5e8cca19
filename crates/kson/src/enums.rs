//! Runtime enumerations
//!
//! Constants are listed in runtime declaration order; conversion goes by
//! ordinal, and [`crate::Kson::new`] checks both order and names.

embedded_enum! {
    /// Severity of a diagnostic [`crate::Message`]
    MessageSeverity = c"org/kson/api/MessageSeverity", c"Lorg/kson/api/MessageSeverity;" {
        Error = c"ERROR",
        Warning = c"WARNING",
    }
}

embedded_enum! {
    /// Output style of [`crate::Kson::format`]
    FormattingStyle = c"org/kson/api/FormattingStyle", c"Lorg/kson/api/FormattingStyle;" {
        Plain = c"PLAIN",
        Delimited = c"DELIMITED",
        Compact = c"COMPACT",
        Classic = c"CLASSIC",
    }
}

embedded_enum! {
    /// Kind of a [`crate::KsonValue`]
    KsonValueType = c"org/kson/api/KsonValueType", c"Lorg/kson/api/KsonValueType;" {
        Object = c"OBJECT",
        Array = c"ARRAY",
        String = c"STRING",
        Integer = c"INTEGER",
        Decimal = c"DECIMAL",
        Boolean = c"BOOLEAN",
        Null = c"NULL",
        Embed = c"EMBED",
    }
}

embedded_enum! {
    /// Lexical class of a [`crate::Token`]
    TokenType = c"org/kson/api/TokenType", c"Lorg/kson/api/TokenType;" {
        CurlyBraceL = c"CURLY_BRACE_L",
        CurlyBraceR = c"CURLY_BRACE_R",
        SquareBracketL = c"SQUARE_BRACKET_L",
        SquareBracketR = c"SQUARE_BRACKET_R",
        AngleBracketL = c"ANGLE_BRACKET_L",
        AngleBracketR = c"ANGLE_BRACKET_R",
        Colon = c"COLON",
        Dot = c"DOT",
        EndDash = c"END_DASH",
        Comma = c"COMMA",
        Comment = c"COMMENT",
        EmbedOpenDelim = c"EMBED_OPEN_DELIM",
        EmbedCloseDelim = c"EMBED_CLOSE_DELIM",
        EmbedTag = c"EMBED_TAG",
        EmbedPreambleNewline = c"EMBED_PREAMBLE_NEWLINE",
        EmbedContent = c"EMBED_CONTENT",
        False = c"FALSE",
        UnquotedString = c"UNQUOTED_STRING",
        IllegalChar = c"ILLEGAL_CHAR",
        ListDash = c"LIST_DASH",
        Null = c"NULL",
        Number = c"NUMBER",
        StringOpenQuote = c"STRING_OPEN_QUOTE",
        StringCloseQuote = c"STRING_CLOSE_QUOTE",
        StringContent = c"STRING_CONTENT",
        True = c"TRUE",
        Whitespace = c"WHITESPACE",
        Eof = c"EOF",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kson_bridge::Enumerated;

    fn assert_table<T: Enumerated + std::fmt::Debug + PartialEq>() {
        assert_eq!(T::CONSTANTS.len(), T::VALUES.len());
        for (index, value) in T::VALUES.iter().enumerate() {
            assert_eq!(value.ordinal(), index, "{:?}", value);
        }
    }

    #[test]
    fn test_tables_line_up() {
        assert_table::<MessageSeverity>();
        assert_table::<FormattingStyle>();
        assert_table::<KsonValueType>();
        assert_table::<TokenType>();
        assert_eq!(TokenType::VALUES.len(), 28);
    }

    #[test]
    fn test_names() {
        assert_eq!(MessageSeverity::Warning.name(), "WARNING");
        assert_eq!(TokenType::UnquotedString.name(), "UNQUOTED_STRING");
        assert_eq!(TokenType::Eof.to_string(), "EOF");
        assert_eq!(KsonValueType::Embed.name(), "EMBED");
    }
}

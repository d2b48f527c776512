//! HTML tokenizer.
//!
//! A character-at-a-time state machine over a fixed state subset. Text is
//! emitted one character per token; attribute names are kept byte-for-byte
//! raw (no case folding, no entity decoding), tag names lower-case ASCII
//! letters only.

/// Token types emitted by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Start tag (e.g., `<div>` or `<img />`)
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    /// End tag (e.g., `</div>`)
    EndTag { name: String },
    /// A single character of text content
    Character(char),
    /// End of input
    Eof,
}

/// One attribute of a start tag, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Tokenization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    TagOpen,
    EndTagOpen,
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterQuotedAttributeValue,
    SelfClosingStartTag,
}

/// HTML tokenizer. One value per parse; all token-in-progress state lives
/// here.
pub struct Tokenizer {
    input: Vec<char>,
    pos: usize,
    state: State,
    current_tag_name: String,
    current_attributes: Vec<Attribute>,
    current_attr_name: String,
    current_attr_value: String,
    building_end_tag: bool,
    self_closing: bool,
    tokens: Vec<Token>,
}

fn is_space(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0C' | ' ')
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            state: State::Data,
            current_tag_name: String::new(),
            current_attributes: Vec::new(),
            current_attr_name: String::new(),
            current_attr_value: String::new(),
            building_end_tag: false,
            self_closing: false,
            tokens: Vec::new(),
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn consume(&mut self) -> Option<char> {
        let ch = self.current_char();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn emit(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn start_tag_token(&mut self, end_tag: bool) {
        self.current_tag_name.clear();
        self.current_attributes.clear();
        self.current_attr_name.clear();
        self.current_attr_value.clear();
        self.building_end_tag = end_tag;
        self.self_closing = false;
    }

    fn emit_current_tag(&mut self) {
        let name = std::mem::take(&mut self.current_tag_name);
        if self.building_end_tag {
            // End tags carry no attributes; anything collected is dropped.
            self.current_attributes.clear();
            self.emit(Token::EndTag { name });
        } else {
            let tag = Token::StartTag {
                name,
                attributes: std::mem::take(&mut self.current_attributes),
                self_closing: self.self_closing,
            };
            self.self_closing = false;
            self.emit(tag);
        }
    }

    /// Fold the pending attribute into the current tag. Duplicate names
    /// keep their original position but take the latest value.
    fn push_current_attr(&mut self) {
        if self.current_attr_name.is_empty() {
            self.current_attr_value.clear();
            return;
        }
        let name = std::mem::take(&mut self.current_attr_name);
        let value = std::mem::take(&mut self.current_attr_value);
        match self.current_attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.current_attributes.push(Attribute { name, value }),
        }
    }

    /// Run the machine over the whole input and return the token stream,
    /// terminated by [`Token::Eof`].
    pub fn tokenize(mut self) -> Vec<Token> {
        while self.pos < self.input.len() {
            match self.state {
                State::Data => self.state_data(),
                State::TagOpen => self.state_tag_open(),
                State::EndTagOpen => self.state_end_tag_open(),
                State::TagName => self.state_tag_name(),
                State::BeforeAttributeName => self.state_before_attribute_name(),
                State::AttributeName => self.state_attribute_name(),
                State::AfterAttributeName => self.state_after_attribute_name(),
                State::BeforeAttributeValue => self.state_before_attribute_value(),
                State::AttributeValueDoubleQuoted => self.state_attribute_value_double_quoted(),
                State::AttributeValueSingleQuoted => self.state_attribute_value_single_quoted(),
                State::AttributeValueUnquoted => self.state_attribute_value_unquoted(),
                State::AfterQuotedAttributeValue => self.state_after_quoted_attribute_value(),
                State::SelfClosingStartTag => self.state_self_closing_start_tag(),
            }
        }

        // End of input in the middle of a tag discards the partial token.
        self.emit(Token::Eof);
        self.tokens
    }

    fn state_data(&mut self) {
        match self.consume() {
            Some('<') => self.state = State::TagOpen,
            Some(ch) => self.emit(Token::Character(ch)),
            None => {}
        }
    }

    fn state_tag_open(&mut self) {
        match self.current_char() {
            Some('/') => {
                self.consume();
                self.state = State::EndTagOpen;
            }
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.start_tag_token(false);
                self.state = State::TagName;
            }
            _ => {
                // Malformed `<`: both it and this character are dropped,
                // not re-emitted as text.
                self.consume();
                self.state = State::Data;
            }
        }
    }

    fn state_end_tag_open(&mut self) {
        match self.current_char() {
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.start_tag_token(true);
                self.state = State::TagName;
            }
            _ => {
                // `</>` and stray characters are swallowed.
                self.consume();
                self.state = State::Data;
            }
        }
    }

    fn state_tag_name(&mut self) {
        match self.consume() {
            Some(ch) if is_space(ch) => {
                self.state = State::BeforeAttributeName;
            }
            Some('/') => {
                self.state = State::SelfClosingStartTag;
            }
            Some('>') => {
                self.emit_current_tag();
                self.state = State::Data;
            }
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.current_tag_name.push(ch.to_ascii_lowercase());
            }
            Some(ch) => {
                self.current_tag_name.push(ch);
            }
            None => {}
        }
    }

    fn state_before_attribute_name(&mut self) {
        match self.consume() {
            Some(ch) if is_space(ch) => {}
            Some('/') | Some('>') => {
                self.pos -= 1;
                self.state = State::AfterAttributeName;
            }
            Some('=') => {
                // Unexpected `=` before an attribute name: swallowed.
            }
            Some(ch) => {
                self.current_attr_name.clear();
                self.current_attr_value.clear();
                self.current_attr_name.push(ch);
                self.state = State::AttributeName;
            }
            None => {}
        }
    }

    fn state_attribute_name(&mut self) {
        match self.consume() {
            Some(ch) if is_space(ch) || ch == '/' || ch == '>' => {
                self.pos -= 1;
                self.push_current_attr();
                self.state = State::AfterAttributeName;
            }
            Some('=') => {
                self.state = State::BeforeAttributeValue;
            }
            Some(ch) => {
                self.current_attr_name.push(ch);
            }
            None => {}
        }
    }

    fn state_after_attribute_name(&mut self) {
        match self.consume() {
            Some(ch) if is_space(ch) => {}
            Some('/') => {
                self.state = State::SelfClosingStartTag;
            }
            Some('=') => {
                self.state = State::BeforeAttributeValue;
            }
            Some('>') => {
                self.emit_current_tag();
                self.state = State::Data;
            }
            Some(ch) => {
                self.current_attr_name.clear();
                self.current_attr_value.clear();
                self.current_attr_name.push(ch);
                self.state = State::AttributeName;
            }
            None => {}
        }
    }

    fn state_before_attribute_value(&mut self) {
        match self.consume() {
            Some(ch) if is_space(ch) => {}
            Some('"') => {
                self.state = State::AttributeValueDoubleQuoted;
            }
            Some('\'') => {
                self.state = State::AttributeValueSingleQuoted;
            }
            Some('>') => {
                // Missing value: the attribute keeps its empty string.
                self.push_current_attr();
                self.emit_current_tag();
                self.state = State::Data;
            }
            Some(_) => {
                self.pos -= 1;
                self.state = State::AttributeValueUnquoted;
            }
            None => {}
        }
    }

    fn state_attribute_value_double_quoted(&mut self) {
        match self.consume() {
            Some('"') => {
                self.push_current_attr();
                self.state = State::AfterQuotedAttributeValue;
            }
            Some(ch) => {
                self.current_attr_value.push(ch);
            }
            None => {}
        }
    }

    fn state_attribute_value_single_quoted(&mut self) {
        match self.consume() {
            Some('\'') => {
                self.push_current_attr();
                self.state = State::AfterQuotedAttributeValue;
            }
            Some(ch) => {
                self.current_attr_value.push(ch);
            }
            None => {}
        }
    }

    fn state_attribute_value_unquoted(&mut self) {
        match self.consume() {
            Some(ch) if is_space(ch) => {
                self.push_current_attr();
                self.state = State::BeforeAttributeName;
            }
            Some('/') => {
                self.push_current_attr();
                self.state = State::SelfClosingStartTag;
            }
            Some('>') => {
                self.push_current_attr();
                self.emit_current_tag();
                self.state = State::Data;
            }
            Some(ch) => {
                self.current_attr_value.push(ch);
            }
            None => {}
        }
    }

    fn state_after_quoted_attribute_value(&mut self) {
        match self.consume() {
            Some(ch) if is_space(ch) => {
                self.state = State::BeforeAttributeName;
            }
            Some('/') => {
                self.state = State::SelfClosingStartTag;
            }
            Some('>') => {
                self.emit_current_tag();
                self.state = State::Data;
            }
            Some(_) => {
                // Missing whitespace between attributes: start the next
                // attribute anyway.
                self.pos -= 1;
                self.state = State::BeforeAttributeName;
            }
            None => {}
        }
    }

    fn state_self_closing_start_tag(&mut self) {
        match self.consume() {
            Some('>') => {
                self.self_closing = true;
                self.emit_current_tag();
                self.state = State::Data;
            }
            Some(_) => {
                self.pos -= 1;
                self.state = State::BeforeAttributeName;
            }
            None => {}
        }
    }
}

/// Tokenize HTML input.
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).tokenize()
}

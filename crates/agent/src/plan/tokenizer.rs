//! Tag tokenizer for model-generated plan text.
//!
//! A single forward pass over byte offsets. Every emitted token advances the
//! cursor, and an unterminated directive moves the machine into `Halted`, so
//! arbitrary input (repeated, nested or dangling tags) terminates.
//!
//! [`Tokenizer::recovering`] is the variant used for marker classification:
//! a dangling opening tag is emitted as text and scanning resumes after it,
//! so markers later in the text are still seen.

/// Paired directive tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Execute,
    Expert,
    Install,
}

impl TagKind {
    pub const ALL: [TagKind; 3] = [TagKind::Execute, TagKind::Expert, TagKind::Install];

    pub fn name(&self) -> &'static str {
        match self {
            TagKind::Execute => "Execute",
            TagKind::Expert => "Expert",
            TagKind::Install => "Install",
        }
    }

    pub fn open(&self) -> &'static str {
        match self {
            TagKind::Execute => "<Execute>",
            TagKind::Expert => "<Expert>",
            TagKind::Install => "<Install>",
        }
    }

    pub fn close(&self) -> &'static str {
        match self {
            TagKind::Execute => "</Execute>",
            TagKind::Expert => "</Expert>",
            TagKind::Install => "</Install>",
        }
    }
}

/// Standalone control markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The answer is final.
    Complete,
    /// Another refinement round is requested.
    Continue,
}

pub const COMPLETE_MARKER: &str = "<FEEDBACK_COMPLETE>";
pub const CONTINUE_MARKER: &str = "<FEEDBACK_REQUIRED>";

impl Signal {
    pub const ALL: [Signal; 2] = [Signal::Complete, Signal::Continue];

    pub fn marker(&self) -> &'static str {
        match self {
            Signal::Complete => COMPLETE_MARKER,
            Signal::Continue => CONTINUE_MARKER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Untagged text.
    Text(&'a str),
    /// A complete `<Tag>payload</Tag>` span.
    Directive {
        kind: TagKind,
        payload: &'a str,
        raw: &'a str,
        offset: usize,
    },
    Marker(Signal),
    /// Opening tag with no closing tag; `raw` runs to end of input.
    Unterminated {
        kind: TagKind,
        raw: &'a str,
        offset: usize,
    },
}

impl<'a> Token<'a> {
    /// Source text covered by the token
    pub fn raw(&self) -> &'a str {
        match self {
            Token::Text(text) => text,
            Token::Directive { raw, .. } | Token::Unterminated { raw, .. } => raw,
            Token::Marker(signal) => signal.marker(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    InDirective { kind: TagKind, open_at: usize },
    Halted,
}

/// Opening construct found while scanning
#[derive(Debug, Clone, Copy)]
enum Opening {
    Tag(TagKind),
    Marker(Signal),
}

impl Opening {
    fn literal(&self) -> &'static str {
        match self {
            Opening::Tag(kind) => kind.open(),
            Opening::Marker(signal) => signal.marker(),
        }
    }
}

pub struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
    state: State,
    recover: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            state: State::Scanning,
            recover: false,
        }
    }

    /// Never halts: an unterminated opening tag becomes `Text`
    pub fn recovering(text: &'a str) -> Self {
        Self {
            recover: true,
            ..Self::new(text)
        }
    }

    /// Nearest opening tag or marker at or after the cursor
    fn next_opening(&self) -> Option<(usize, Opening)> {
        let rest = &self.text[self.pos..];
        let tags = TagKind::ALL.iter().map(|k| Opening::Tag(*k));
        let markers = Signal::ALL.iter().map(|s| Opening::Marker(*s));

        tags.chain(markers)
            .filter_map(|opening| rest.find(opening.literal()).map(|i| (self.pos + i, opening)))
            .min_by_key(|(at, _)| *at)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            match self.state {
                State::Halted => return None,
                State::Scanning => {
                    if self.pos >= self.text.len() {
                        self.state = State::Halted;
                        return None;
                    }
                    match self.next_opening() {
                        None => {
                            let text = &self.text[self.pos..];
                            self.pos = self.text.len();
                            return Some(Token::Text(text));
                        }
                        Some((at, _)) if at > self.pos => {
                            let text = &self.text[self.pos..at];
                            self.pos = at;
                            return Some(Token::Text(text));
                        }
                        Some((at, Opening::Marker(signal))) => {
                            self.pos = at + signal.marker().len();
                            return Some(Token::Marker(signal));
                        }
                        Some((at, Opening::Tag(kind))) => {
                            self.pos = at + kind.open().len();
                            self.state = State::InDirective { kind, open_at: at };
                        }
                    }
                }
                State::InDirective { kind, open_at } => {
                    let rest = &self.text[self.pos..];
                    match rest.find(kind.close()) {
                        Some(rel) => {
                            let payload = &rest[..rel];
                            let end = self.pos + rel + kind.close().len();
                            let raw = &self.text[open_at..end];
                            self.pos = end;
                            self.state = State::Scanning;
                            return Some(Token::Directive {
                                kind,
                                payload,
                                raw,
                                offset: open_at,
                            });
                        }
                        None if self.recover => {
                            // Cursor already sits past the opening tag.
                            self.state = State::Scanning;
                            return Some(Token::Text(&self.text[open_at..self.pos]));
                        }
                        None => {
                            self.pos = self.text.len();
                            self.state = State::Halted;
                            return Some(Token::Unterminated {
                                kind,
                                raw: &self.text[open_at..],
                                offset: open_at,
                            });
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token<'_>> {
        Tokenizer::new(text).collect()
    }

    #[test]
    fn test_plain_text_is_single_token() {
        assert_eq!(tokens("just words"), vec![Token::Text("just words")]);
        assert!(tokens("").is_empty());
    }

    #[test]
    fn test_directive_between_text() {
        let toks = tokens("a <Execute>ls</Execute> b");
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[0], Token::Text("a "));
        match &toks[1] {
            Token::Directive {
                kind,
                payload,
                raw,
                offset,
            } => {
                assert_eq!(*kind, TagKind::Execute);
                assert_eq!(*payload, "ls");
                assert_eq!(*raw, "<Execute>ls</Execute>");
                assert_eq!(*offset, 2);
            }
            other => panic!("Expected directive, got {:?}", other),
        }
        assert_eq!(toks[2], Token::Text(" b"));
    }

    #[test]
    fn test_nearest_opening_wins() {
        let toks = tokens("<Expert>A: x</Expert><Execute>pwd</Execute>");
        let kinds: Vec<_> = toks
            .iter()
            .filter_map(|t| match t {
                Token::Directive { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![TagKind::Expert, TagKind::Execute]);
    }

    #[test]
    fn test_markers_are_tokens() {
        let toks = tokens("<FEEDBACK_COMPLETE> done");
        assert_eq!(toks, vec![Token::Marker(Signal::Complete), Token::Text(" done")]);
    }

    #[test]
    fn test_unterminated_halts() {
        let toks = tokens("x <Execute>ls -la <Execute>pwd");
        assert_eq!(toks.len(), 2);
        assert!(matches!(
            toks[1],
            Token::Unterminated {
                kind: TagKind::Execute,
                raw: "<Execute>ls -la <Execute>pwd",
                offset: 2
            }
        ));
    }

    #[test]
    fn test_recovering_scans_past_dangling_tag() {
        let text = "Use <Execute>ls to list. <FEEDBACK_COMPLETE>";
        let toks: Vec<_> = Tokenizer::recovering(text).collect();
        assert_eq!(
            toks,
            vec![
                Token::Text("Use "),
                Token::Text("<Execute>"),
                Token::Text("ls to list. "),
                Token::Marker(Signal::Complete),
            ]
        );
        let rebuilt: String = toks.iter().map(|t| t.raw()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_recovering_still_yields_later_directives() {
        let toks: Vec<_> =
            Tokenizer::recovering("<Expert>x <Execute>pwd</Execute>").collect();
        assert_eq!(toks[0], Token::Text("<Expert>"));
        assert!(toks.iter().any(|t| matches!(
            t,
            Token::Directive {
                kind: TagKind::Execute,
                payload: "pwd",
                ..
            }
        )));
    }

    #[test]
    fn test_nested_open_is_part_of_payload() {
        let toks = tokens("<Execute>a<Execute>b</Execute>");
        assert!(matches!(
            toks[0],
            Token::Directive {
                payload: "a<Execute>b",
                ..
            }
        ));
        assert_eq!(toks.len(), 1);
    }

    #[test]
    fn test_tokens_cover_input_exactly() {
        let text = "pre<Execute>ls</Execute>mid<FEEDBACK_REQUIRED><Install>jq</Install>post<Expert>n";
        let rebuilt: String = tokens(text).iter().map(|t| t.raw()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_multibyte_text_is_preserved() {
        let text = "héllo ✓ <Execute>echo ü</Execute> ✗";
        let rebuilt: String = tokens(text).iter().map(|t| t.raw()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_stray_closing_tags_are_text() {
        let toks = tokens("</Execute></Expert>");
        assert_eq!(toks, vec![Token::Text("</Execute></Expert>")]);
    }
}

//! Incrementally-received text fields
//!
//! Programme service names, radiotext, and programme type
//! names are all transmitted a few characters at a time.
//! Each group addresses a *segment* of the text. A [`Text`]
//! buffers the segments and decides when a new message has
//! started.

use std::collections::HashMap;

/// An incrementally-received text
///
/// Characters are written by segment with
/// [`set_chars()`](Text::set_chars). Unwritten positions
/// hold a null character.
///
/// A message ends when an already-written position receives
/// a *different* character. The old message is archived, and
/// the buffer starts over. For texts which carry an A/B flag,
/// like radiotext, a change of flag also starts a new message.
///
/// Each archived message is credited with the number of
/// writes it received. The most frequent message is the best
/// estimate of a text which alternates between several values,
/// like a dynamic PS name.
///
/// ```
/// use rdsurvey::station::Text;
///
/// let mut ps = Text::new(8, false);
/// ps.set_chars(0, &['C', 'U']);
/// ps.set_chars(1, &['L', 'T']);
/// assert_eq!(Some("CULT    ".to_owned()), ps.current());
/// assert!(!ps.is_complete());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    current: Vec<char>,
    uses_flags: bool,
    flags: u8,
    latest_flag: Option<u8>,
    empty: bool,
    ticks: u32,
    messages: Vec<String>,
    tick_history: HashMap<String, u32>,
}

impl Text {
    /// New empty text of `size` characters
    ///
    /// If `uses_flags` is set, archived messages are prefixed
    /// with the A/B flags seen while they were received, like
    /// `[A] `.
    pub fn new(size: usize, uses_flags: bool) -> Self {
        Self {
            current: vec!['\0'; size],
            uses_flags,
            flags: 0,
            latest_flag: None,
            empty: true,
            ticks: 0,
            messages: Vec::new(),
            tick_history: HashMap::new(),
        }
    }

    /// Text capacity, in characters
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// True if nothing has been written since the last reset
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Write the characters of segment `position`
    ///
    /// Segment `position` begins at character
    /// `position * chars.len()`. Characters which would fall
    /// outside the buffer are dropped.
    pub fn set_chars(&mut self, position: usize, chars: &[char]) {
        let start = position * chars.len();
        let conflict = chars.iter().enumerate().any(|(i, ch)| {
            matches!(self.current.get(start + i), Some(&old) if old != '\0' && old != *ch)
        });
        if conflict {
            self.archive();
        }

        for (i, ch) in chars.iter().enumerate() {
            if let Some(slot) = self.current.get_mut(start + i) {
                *slot = *ch;
            }
        }
        self.ticks += 1;
        self.empty = false;
    }

    /// Record the A/B flag of the text being received
    ///
    /// A change from the previous flag marks the start of a
    /// new message.
    pub fn set_flag(&mut self, flag: u8) {
        let flag = flag & 1;
        if matches!(self.latest_flag, Some(prev) if prev != flag) {
            self.archive();
            self.flags = 0;
        }
        self.flags |= 1 << flag;
        self.latest_flag = Some(flag);
    }

    /// Most recent A/B flag, if any
    pub fn latest_flag(&self) -> Option<u8> {
        self.latest_flag
    }

    /// Clear the current message without archiving it
    pub fn reset(&mut self) {
        self.current.iter_mut().for_each(|c| *c = '\0');
        self.empty = true;
        self.ticks = 0;
    }

    /// True if every position has been written
    pub fn is_complete(&self) -> bool {
        !self.current.contains(&'\0')
    }

    /// The message being received, if any
    ///
    /// Unwritten positions are shown as spaces. The text ends
    /// at a carriage return. Other control characters are
    /// shown in hex, like `<1f>`.
    pub fn current(&self) -> Option<String> {
        if self.empty {
            return None;
        }

        let mut out = String::with_capacity(self.current.len());
        for &ch in self.current.iter() {
            match ch {
                '\r' => break,
                '\0' => out.push(' '),
                c if (c as u32) < 32 => out.push_str(&format!("<{:x}>", c as u32)),
                c => out.push(c),
            }
        }
        Some(out)
    }

    /// Archived messages
    ///
    /// If `including_current` is set and the current message
    /// is complete, it is included at the end.
    pub fn past_messages(&self, including_current: bool) -> Vec<String> {
        let mut out = self.messages.clone();
        if including_current && self.is_complete() {
            out.extend(self.current());
        }
        out
    }

    /// The message which has been received most often
    ///
    /// The current message competes only once it is complete.
    /// Returns an empty string if there is no candidate.
    pub fn most_frequent_text(&self) -> String {
        let mut counts = self.tick_history.clone();
        if self.is_complete() {
            if let Some(cur) = self.current_message() {
                *counts.entry(cur).or_insert(0) += self.ticks;
            }
        }

        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(text, _)| text)
            .unwrap_or_default()
    }

    /// The most frequent message, or the partial message
    pub fn most_frequent_or_partial_text(&self) -> String {
        let out = self.most_frequent_text();
        if out.is_empty() {
            self.current().unwrap_or_default()
        } else {
            out
        }
    }

    /// The current message if complete, else the latest archived one
    ///
    /// If there is no archived message, returns the partial
    /// current message.
    pub fn latest_complete_or_partial_text(&self) -> String {
        if self.is_complete() {
            self.current().unwrap_or_default()
        } else if let Some(last) = self.messages.last() {
            last.clone()
        } else {
            self.current().unwrap_or_default()
        }
    }

    // current text, with the flag prefix used for archiving
    fn current_message(&self) -> Option<String> {
        let text = self.current()?;
        if self.uses_flags {
            let mut prefix = String::from("[");
            for (f, name) in ['A', 'B'].iter().enumerate() {
                if self.flags & (1 << f) != 0 {
                    prefix.push(*name);
                }
            }
            prefix.push_str("] ");
            Some(prefix + &text)
        } else {
            Some(text)
        }
    }

    // move the current message into the history
    fn archive(&mut self) {
        if let Some(msg) = self.current_message() {
            *self.tick_history.entry(msg.clone()).or_insert(0) += self.ticks;
            self.messages.push(msg);
        }
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_culture(text: &mut Text) {
        text.set_chars(0, &[' ', 'C']);
        text.set_chars(1, &['U', 'L']);
        text.set_chars(2, &['T', 'U']);
        text.set_chars(3, &['R', 'E']);
    }

    #[test]
    fn test_message_boundary() {
        let mut text = Text::new(8, false);
        text.set_chars(0, &['C', 'U']);
        text.set_chars(1, &['L', 'T']);
        text.set_chars(2, &['U', 'R']);
        text.set_chars(3, &['E', ' ']);
        assert!(text.is_complete());
        assert_eq!(Some("CULTURE ".to_owned()), text.current());

        // same characters again: no boundary
        text.set_chars(0, &['C', 'U']);
        assert!(text.past_messages(false).is_empty());

        // different character in a written position
        text.set_chars(0, &['X', 'U']);
        assert_eq!(vec!["CULTURE ".to_owned()], text.past_messages(false));
        assert_eq!(Some("XU      ".to_owned()), text.current());
        assert!(!text.is_complete());
        assert_eq!("CULTURE ", text.latest_complete_or_partial_text());
    }

    #[test]
    fn test_flag_boundary() {
        let mut rt = Text::new(64, true);
        rt.set_flag(0);
        rt.set_chars(0, &['H', 'E', 'L', 'O']);
        rt.set_flag(0);
        rt.set_chars(1, &['\r', ' ', ' ', ' ']);
        assert_eq!(Some("HELO".to_owned()), rt.current());

        // A → B starts a new message
        rt.set_flag(1);
        rt.set_chars(0, &['B', 'Y', 'E', '\r']);
        assert_eq!(vec!["[A] HELO".to_owned()], rt.past_messages(false));
        assert_eq!(Some("BYE".to_owned()), rt.current());
        assert_eq!(Some(1), rt.latest_flag());
    }

    #[test]
    fn test_control_chars() {
        let mut text = Text::new(4, false);
        assert_eq!(None, text.current());
        text.set_chars(0, &['A', '\u{1f}']);
        assert_eq!(Some("A<1f>  ".to_owned()), text.current());
    }

    #[test]
    fn test_most_frequent() {
        let mut ps = Text::new(8, false);
        assert_eq!("", ps.most_frequent_or_partial_text());

        write_culture(&mut ps);
        write_culture(&mut ps);
        assert_eq!(" CULTURE", ps.most_frequent_text());

        // a short-lived alternate page
        ps.set_chars(0, &['R', 'A']);
        ps.set_chars(1, &['D', 'I']);
        ps.set_chars(2, &['O', ' ']);
        ps.set_chars(3, &['1', ' ']);
        assert_eq!(" CULTURE", ps.most_frequent_text());

        // back to the main page, now partial
        ps.set_chars(0, &[' ', 'C']);
        assert_eq!(" CULTURE", ps.most_frequent_or_partial_text());
        assert_eq!(
            vec![" CULTURE".to_owned(), "RADIO 1 ".to_owned()],
            ps.past_messages(false)
        );
    }
}

/// The header lines attached to every request of a run.
///
/// The protocol label is sent as a header line exactly as given, not as the value of a named header such as
/// `Sec-WebSocket-Protocol`. Pass a complete `Name: value` line as the label to send a named header instead.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderSet {
    lines: Vec<String>,
}

impl HeaderSet {
    /// Builds the header set: `Accept-Encoding: deflate` when `deflate` is set, then the protocol label.
    pub fn new(protocol: &str, deflate: bool) -> Self {
        let mut lines = Vec::with_capacity(2);
        if deflate {
            lines.push("Accept-Encoding: deflate".to_owned());
        }

        lines.push(protocol.to_owned());
        HeaderSet { lines }
    }

    /// Returns the header lines in the order they are sent.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use crate::HeaderSet;

    #[test]
    fn protocol_label_is_sent_verbatim() {
        assert_eq!(&["wscat-protocol".to_owned()][..], HeaderSet::new("wscat-protocol", false).lines());
    }

    #[test]
    fn deflate_comes_first_and_only_once() {
        let headers = HeaderSet::new("chat", true);
        assert_eq!(
            &["Accept-Encoding: deflate".to_owned(), "chat".to_owned()][..],
            headers.lines()
        );
    }
}

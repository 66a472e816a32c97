/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` framing over arbitrary byte chunks.
#[derive(Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    current_event: Vec<u8>,
    current_data: Vec<u8>,
    has_data: bool,
}

impl SseDecoder {
    pub fn ingest_chunk(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut out = Vec::new();
        self.buffer.extend_from_slice(chunk);

        let buf = std::mem::take(&mut self.buffer);
        let mut start = 0usize;
        for (idx, b) in buf.iter().enumerate() {
            if *b != b'\n' {
                continue;
            }

            let mut line = &buf[start..idx];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            if let Some(ev) = self.ingest_line(line) {
                out.push(ev);
            }
            start = idx + 1;
        }

        if start < buf.len() {
            self.buffer.extend_from_slice(&buf[start..]);
        }
        out
    }

    /// Flushes a trailing event when the stream ends without a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let mut tail = std::mem::take(&mut self.buffer);
            if tail.last() == Some(&b'\r') {
                tail.pop();
            }
            if let Some(ev) = self.ingest_line(&tail) {
                return Some(ev);
            }
        }
        self.flush_event()
    }

    fn ingest_line(&mut self, line: &[u8]) -> Option<SseEvent> {
        if line.is_empty() {
            return self.flush_event();
        }
        if line[0] == b':' {
            return None;
        }

        let (field, value) = match line.iter().position(|b| *b == b':') {
            Some(i) => {
                let mut v = &line[i + 1..];
                if v.first() == Some(&b' ') {
                    v = &v[1..];
                }
                (&line[..i], v)
            }
            None => (line, &b""[..]),
        };

        match field {
            b"event" => {
                self.current_event.clear();
                self.current_event.extend_from_slice(value);
            }
            b"data" => {
                if self.has_data {
                    self.current_data.push(b'\n');
                }
                self.current_data.extend_from_slice(value);
                self.has_data = true;
            }
            _ => {}
        }
        None
    }

    fn flush_event(&mut self) -> Option<SseEvent> {
        if !self.has_data && self.current_event.is_empty() {
            return None;
        }

        let event = if self.current_event.is_empty() {
            "message".to_string()
        } else {
            String::from_utf8_lossy(&self.current_event).into_owned()
        };
        let data = String::from_utf8_lossy(&self.current_data).into_owned();

        self.current_event.clear();
        self.current_data.clear();
        self.has_data = false;

        Some(SseEvent { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_split_across_chunks() {
        let mut d = SseDecoder::default();
        assert!(d.ingest_chunk(b"event: put\r\ndata: {\"path\":\"/\",").is_empty());
        let evs = d.ingest_chunk(b"\"data\":null}\r\n\r\nevent: keep-alive\ndata: null\n\n");

        assert_eq!(
            evs,
            vec![
                SseEvent {
                    event: "put".into(),
                    data: r#"{"path":"/","data":null}"#.into()
                },
                SseEvent {
                    event: "keep-alive".into(),
                    data: "null".into()
                },
            ]
        );
    }

    #[test]
    fn comments_ignored_and_multiline_data_joined() {
        let mut d = SseDecoder::default();
        let evs = d.ingest_chunk(b": ping\ndata: a\ndata: b\n\n");
        assert_eq!(
            evs,
            vec![SseEvent {
                event: "message".into(),
                data: "a\nb".into()
            }]
        );
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut d = SseDecoder::default();
        assert!(d.ingest_chunk(b"event: cancel\ndata: permission denied").is_empty());
        assert_eq!(
            d.finish(),
            Some(SseEvent {
                event: "cancel".into(),
                data: "permission denied".into()
            })
        );
        assert_eq!(d.finish(), None);
    }
}

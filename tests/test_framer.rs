use rawframe::http::framer::{
    Framing, FramingError, RequestBuffer, declared_content_length, find_header_end,
    wants_keep_alive,
};

const LIMIT: usize = 64 * 1024;

fn feed(buf: &mut RequestBuffer, chunks: &[&[u8]]) -> Vec<Framing> {
    chunks.iter().map(|c| buf.push(c)).collect()
}

fn complete_text(framing: &Framing) -> &str {
    match framing {
        Framing::Complete(text) => text,
        other => panic!("expected a complete request, got {:?}", other),
    }
}

#[test]
fn test_get_without_content_length_split_mid_header() {
    let mut buf = RequestBuffer::new(LIMIT);
    let results = feed(&mut buf, &[&b"GET /x HTTP/1.1\r\nHo"[..], &b"st: h\r\n\r\n"[..]]);

    assert_eq!(results[0], Framing::Incomplete);
    assert_eq!(complete_text(&results[1]), "GET /x HTTP/1.1\r\nHost: h\r\n\r\n");
}

#[test]
fn test_incomplete_headers_wait() {
    let mut buf = RequestBuffer::new(LIMIT);
    assert_eq!(buf.push(b"GET / HTTP/1.1\r\nHost: example.com\r\n"), Framing::Incomplete);
    assert!(!buf.is_done());
}

#[test]
fn test_body_completes_only_after_last_byte() {
    let mut buf = RequestBuffer::new(LIMIT);
    let head = b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\n";

    assert_eq!(buf.push(head), Framing::Incomplete);
    for b in b"hell" {
        assert_eq!(buf.push(&[*b]), Framing::Incomplete);
    }

    let last = buf.push(b"o");
    assert_eq!(
        complete_text(&last),
        "POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"
    );
}

#[test]
fn test_bare_lf_framing() {
    let mut buf = RequestBuffer::new(LIMIT);
    assert_eq!(buf.push(b"POST / HTTP/1.0\nContent-Length: 2\n\na"), Framing::Incomplete);
    assert!(matches!(buf.push(b"b"), Framing::Complete(_)));
}

#[test]
fn test_content_length_counts_bytes_not_chars() {
    // "héllo" is 6 bytes in UTF-8
    let body = "héllo";
    let req = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
    let bytes = req.as_bytes();

    let mut buf = RequestBuffer::new(LIMIT);
    assert_eq!(buf.push(&bytes[..bytes.len() - 1]), Framing::Incomplete);
    assert_eq!(complete_text(&buf.push(&bytes[bytes.len() - 1..])), req);
}

#[test]
fn test_split_multibyte_char_is_preserved() {
    let req = "POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\n€!";
    let bytes = req.as_bytes();
    let euro_start = bytes.len() - 4;

    let mut buf = RequestBuffer::new(LIMIT);
    buf.push(&bytes[..euro_start + 1]);
    buf.push(&bytes[euro_start + 1..euro_start + 2]);
    let last = buf.push(&bytes[euro_start + 2..]);

    assert_eq!(complete_text(&last), req);
}

#[test]
fn test_chunking_does_not_change_emitted_text() {
    let req = "PUT /doc HTTP/1.1\r\nHost: h\r\nContent-Length: 26\r\n\r\nabcdefghijklmnopqrstuvwxyz".as_bytes();

    let mut whole = RequestBuffer::new(LIMIT);
    let expected = match whole.push(req) {
        Framing::Complete(text) => text,
        other => panic!("unexpected {:?}", other),
    };

    for size in [1, 2, 3, 5, 7, 11, 50] {
        let mut buf = RequestBuffer::new(LIMIT);
        let mut emitted = Vec::new();
        for chunk in req.chunks(size) {
            if let Framing::Complete(text) = buf.push(chunk) {
                emitted.push(text);
            }
        }
        assert_eq!(emitted, vec![expected.clone()], "chunk size {}", size);
    }
}

#[test]
fn test_further_bytes_after_emission_are_ignored() {
    let mut buf = RequestBuffer::new(LIMIT);
    assert!(matches!(buf.push(b"GET / HTTP/1.1\r\n\r\n"), Framing::Complete(_)));
    assert_eq!(buf.push(b"GET /again HTTP/1.1\r\n\r\n"), Framing::Ignored);
    assert_eq!(buf.push(b"more"), Framing::Ignored);
}

#[test]
fn test_keep_alive_variants_rejected() {
    let variants: [&[u8]; 4] = [
        b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
        b"GET / HTTP/1.1\r\nconnection: Keep-Alive\r\n\r\n",
        b"GET / HTTP/1.1\r\nCONNECTION:KEEP-ALIVE\r\n\r\n",
        b"GET / HTTP/1.1\nHost: h\nConnection:\tkeep-alive\n\n",
    ];

    for req in variants {
        let mut buf = RequestBuffer::new(LIMIT);
        assert_eq!(buf.push(req), Framing::KeepAliveRejected);
        assert_eq!(buf.push(b"x"), Framing::Ignored);
    }
}

#[test]
fn test_keep_alive_checked_before_body() {
    let mut buf = RequestBuffer::new(LIMIT);
    let req = b"POST / HTTP/1.1\r\nConnection: keep-alive\r\nContent-Length: 10\r\n\r\n";
    assert_eq!(buf.push(req), Framing::KeepAliveRejected);
}

#[test]
fn test_connection_close_is_accepted() {
    let mut buf = RequestBuffer::new(LIMIT);
    let req = b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n";
    assert!(matches!(buf.push(req), Framing::Complete(_)));
}

#[test]
fn test_keep_alive_with_two_spaces_is_not_matched() {
    assert!(!wants_keep_alive(b"GET / HTTP/1.1\r\nConnection:  keep-alive"));
}

#[test]
fn test_keep_alive_in_body_is_not_matched() {
    let mut buf = RequestBuffer::new(LIMIT);
    let req = b"POST / HTTP/1.1\r\nContent-Length: 24\r\n\r\n\nConnection: keep-alive\n";
    assert!(matches!(buf.push(req), Framing::Complete(_)));
}

#[test]
fn test_negative_content_length_rejected() {
    let mut buf = RequestBuffer::new(LIMIT);
    assert_eq!(
        buf.push(b"POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n"),
        Framing::Rejected(FramingError::NegativeContentLength(-1))
    );
}

#[test]
fn test_huge_content_length_rejected() {
    let mut buf = RequestBuffer::new(LIMIT);
    assert_eq!(
        buf.push(b"POST / HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n"),
        Framing::Rejected(FramingError::ContentLengthOutOfRange)
    );
}

#[test]
fn test_declared_length_over_limit_rejected() {
    let mut buf = RequestBuffer::new(100);
    assert_eq!(
        buf.push(b"POST / HTTP/1.1\r\nContent-Length: 500\r\n\r\n"),
        Framing::Rejected(FramingError::TooLarge { limit: 100 })
    );
}

#[test]
fn test_unterminated_headers_over_limit_rejected() {
    let mut buf = RequestBuffer::new(16);
    assert_eq!(buf.push(b"GET / HTTP/1.1\r\n"), Framing::Incomplete);
    assert_eq!(
        buf.push(b"X-Long: aaaa"),
        Framing::Rejected(FramingError::TooLarge { limit: 16 })
    );
}

#[test]
fn test_zero_content_length_completes_at_header_end() {
    let mut buf = RequestBuffer::new(LIMIT);
    assert!(matches!(
        buf.push(b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n"),
        Framing::Complete(_)
    ));
}

#[test]
fn test_find_header_end_crlf() {
    let end = find_header_end(b"GET / HTTP/1.1\r\nHost: h\r\n\r\nbody").unwrap();
    assert_eq!(end.offset, 23);
    assert_eq!(end.line_break, 4);
    assert_eq!(end.body_len(31), 4);
}

#[test]
fn test_find_header_end_missing() {
    assert!(find_header_end(b"GET / HTTP/1.1\r\nHost: h\r\n").is_none());
}

#[test]
fn test_declared_content_length_case_insensitive() {
    assert_eq!(
        declared_content_length(b"POST / HTTP/1.1\r\ncontent-length:12"),
        Some(Ok(12))
    );
    assert_eq!(declared_content_length(b"POST / HTTP/1.1\r\nHost: h"), None);
}

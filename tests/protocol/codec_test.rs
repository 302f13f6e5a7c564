//! Chunking tests for the line decoder.

use gomoku_bridge::protocol::{decode, finish, parse_line, EngineEvent, LineDecoder};

const STREAM: &[u8] = b"AI_THINKING\nMOVED 7,7,1\r\n\nWINNER BLACK\n";

fn expected() -> Vec<String> {
    vec![
        "AI_THINKING".to_string(),
        "MOVED 7,7,1".to_string(),
        "WINNER BLACK".to_string(),
    ]
}

fn decode_chunks(chunks: &[&[u8]]) -> Vec<String> {
    let mut decoder = LineDecoder::new();
    let mut lines: Vec<String> = chunks.iter().flat_map(|c| decoder.decode(c)).collect();
    lines.extend(decoder.finish());
    lines
}

#[test]
fn every_single_split_point_yields_the_same_lines() {
    for split in 0..=STREAM.len() {
        let (head, tail) = STREAM.split_at(split);
        assert_eq!(
            decode_chunks(&[head, tail]),
            expected(),
            "split at byte {split}"
        );
    }
}

#[test]
fn every_pair_of_split_points_yields_the_same_lines() {
    for first in 0..=STREAM.len() {
        for second in first..=STREAM.len() {
            let chunks = [
                &STREAM[..first],
                &STREAM[first..second],
                &STREAM[second..],
            ];
            assert_eq!(
                decode_chunks(&chunks),
                expected(),
                "splits at {first} and {second}"
            );
        }
    }
}

#[test]
fn byte_at_a_time_preserves_order() {
    let chunks: Vec<&[u8]> = STREAM.chunks(1).collect();
    assert_eq!(decode_chunks(&chunks), expected());
}

#[test]
fn free_functions_share_one_carry() {
    let mut carry = Vec::new();
    assert!(decode(b"MOVED 3,", &mut carry).is_empty());
    assert_eq!(decode(b"4,2\nAI_", &mut carry), vec!["MOVED 3,4,2"]);
    assert_eq!(carry, b"AI_");
    assert!(decode(b"THINKING", &mut carry).is_empty());
    assert_eq!(finish(&mut carry).as_deref(), Some("AI_THINKING"));
    assert!(carry.is_empty());
}

#[test]
fn decoded_lines_parse_into_events() {
    let events: Vec<EngineEvent> = decode_chunks(&[STREAM])
        .iter()
        .map(|line| parse_line(line))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], EngineEvent::AiThinking);
    assert!(matches!(events[1], EngineEvent::MoveConfirmed { .. }));
    assert!(events[2].is_terminal());
}

#[test]
fn multibyte_text_split_inside_a_character_survives() {
    let stream = "ENGINE_NOTE déjà\nAI_THINKING\n".as_bytes();
    let split = stream.iter().position(|&b| b >= 0x80).unwrap() + 1;
    let lines = decode_chunks(&[&stream[..split], &stream[split..]]);
    assert_eq!(lines, vec!["ENGINE_NOTE déjà", "AI_THINKING"]);
}

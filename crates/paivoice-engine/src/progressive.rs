//! Progressive synthesis-and-playback pipeline.
//!
//! High-latency engines take seconds per utterance; splitting the message
//! into sentences and overlapping generation of sentence `i+1` with
//! playback of sentence `i` cuts the perceived time to first audio.
//!
//! The pipeline is a small state machine over a slot array driven by three
//! events: a slot fills (the generator sent sentence `i`), the player
//! exits (the consumer loop advances its cursor), and generation finishes
//! (the channel closes). Exactly one generator and at most one player run
//! at any time; playback order is strictly by sentence index, and slots
//! that filled with an empty buffer are skipped.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::debug;

/// Run the pipeline over pre-split sentences.
///
/// `synth` renders one sentence to audio bytes (empty bytes mean the
/// sentence failed and is skipped); `play` plays one buffer and reports
/// whether playback succeeded. Returns the number of sentences played.
///
/// Playback of sentence `i` begins no earlier than the player for `i-1`
/// exits and no earlier than generation of `i` completes.
pub async fn run_progressive<G, GF, P, PF>(sentences: &[String], mut synth: G, mut play: P) -> usize
where
    G: FnMut(usize, String) -> GF,
    GF: Future<Output = Vec<u8>>,
    P: FnMut(usize, Vec<u8>) -> PF,
    PF: Future<Output = bool>,
{
    let total = sentences.len();
    if total == 0 {
        return 0;
    }

    // Capacity covers every sentence so the generator never stalls on a
    // slow player.
    let (slot_tx, mut slot_rx) = mpsc::channel::<(usize, Vec<u8>)>(total);

    let generator = async move {
        for (index, sentence) in sentences.iter().enumerate() {
            let bytes = synth(index, sentence.clone()).await;
            debug!(index, bytes = bytes.len(), "Sentence generated");
            if slot_tx.send((index, bytes)).await.is_err() {
                break;
            }
        }
        // Dropping the sender signals generation-done to the consumer.
    };

    let consumer = async move {
        let mut slots: Vec<Option<Vec<u8>>> = (0..total).map(|_| None).collect();
        let mut cursor = 0;
        let mut generation_done = false;
        let mut played = 0;

        while cursor < total {
            // Wait for the cursor's slot to fill, absorbing out-of-order
            // arrivals into the slot array.
            while slots[cursor].is_none() && !generation_done {
                match slot_rx.recv().await {
                    Some((index, bytes)) => slots[index] = Some(bytes),
                    None => generation_done = true,
                }
            }

            match slots[cursor].take() {
                Some(bytes) if !bytes.is_empty() => {
                    if play(cursor, bytes).await {
                        played += 1;
                    }
                }
                // Failed generation (empty buffer) or generation ended
                // before this slot filled: skip and advance.
                _ => debug!(index = cursor, "Skipping empty sentence slot"),
            }
            cursor += 1;
        }
        played
    };

    let ((), played) = tokio::join!(generator, consumer);
    played
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::sleep;

    fn sentences(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Sentence {i}.")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn plays_in_order_and_never_overlaps() {
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let playing = Arc::new(Mutex::new(false));

        let gen_events = Arc::clone(&events);
        let play_events = Arc::clone(&events);
        let play_flag = Arc::clone(&playing);

        let played = run_progressive(
            &sentences(3),
            move |i, _text| {
                let events = Arc::clone(&gen_events);
                async move {
                    sleep(Duration::from_millis(100)).await;
                    events.lock().unwrap().push(format!("gen {i}"));
                    vec![i as u8 + 1]
                }
            },
            move |i, _bytes| {
                let events = Arc::clone(&play_events);
                let playing = Arc::clone(&play_flag);
                async move {
                    {
                        let mut flag = playing.lock().unwrap();
                        assert!(!*flag, "two players active at once");
                        *flag = true;
                    }
                    events.lock().unwrap().push(format!("play {i} start"));
                    sleep(Duration::from_millis(250)).await;
                    events.lock().unwrap().push(format!("play {i} end"));
                    *playing.lock().unwrap() = false;
                    true
                }
            },
        )
        .await;

        assert_eq!(played, 3);
        let events = events.lock().unwrap().clone();

        // Playback order is strictly by index.
        let play_starts: Vec<&String> =
            events.iter().filter(|e| e.ends_with("start")).collect();
        assert_eq!(play_starts, ["play 0 start", "play 1 start", "play 2 start"]);

        // Generation of i precedes playback of i.
        for i in 0..3 {
            let gen_pos = events.iter().position(|e| e == &format!("gen {i}")).unwrap();
            let play_pos = events
                .iter()
                .position(|e| e == &format!("play {i} start"))
                .unwrap();
            assert!(gen_pos < play_pos, "sentence {i} played before generated");
        }

        // Playback of i begins only after i-1 ended.
        for i in 1..3 {
            let prev_end = events
                .iter()
                .position(|e| e == &format!("play {} end", i - 1))
                .unwrap();
            let this_start = events
                .iter()
                .position(|e| e == &format!("play {i} start"))
                .unwrap();
            assert!(prev_end < this_start);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn generation_runs_ahead_of_playback() {
        // Fast generation, slow playback: by the time sentence 0 finishes
        // playing, sentences 1 and 2 must already be generated.
        let generated: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let gen_log = Arc::clone(&generated);
        let seen_at_first_play_end: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
        let seen = Arc::clone(&seen_at_first_play_end);
        let gen_for_play = Arc::clone(&generated);

        run_progressive(
            &sentences(3),
            move |i, _text| {
                let log = Arc::clone(&gen_log);
                async move {
                    sleep(Duration::from_millis(10)).await;
                    log.lock().unwrap().push(i);
                    vec![1]
                }
            },
            move |i, _bytes| {
                let seen = Arc::clone(&seen);
                let generated = Arc::clone(&gen_for_play);
                async move {
                    sleep(Duration::from_millis(500)).await;
                    if i == 0 {
                        *seen.lock().unwrap() = generated.lock().unwrap().len();
                    }
                    true
                }
            },
        )
        .await;

        assert_eq!(*seen_at_first_play_end.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn empty_slot_is_skipped() {
        let played_indices: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&played_indices);

        let played = run_progressive(
            &sentences(3),
            |i, _text| async move {
                if i == 1 {
                    Vec::new() // generation failed for this sentence
                } else {
                    vec![1]
                }
            },
            move |i, _bytes| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(i);
                    true
                }
            },
        )
        .await;

        assert_eq!(played, 2);
        assert_eq!(*played_indices.lock().unwrap(), vec![0, 2]);
    }

    #[tokio::test]
    async fn failed_playback_is_not_counted() {
        let played = run_progressive(
            &sentences(2),
            |_i, _text| async { vec![1] },
            |i, _bytes| async move { i == 0 },
        )
        .await;
        assert_eq!(played, 1);
    }

    #[tokio::test]
    async fn empty_input_plays_nothing() {
        let played =
            run_progressive(&[], |_i, _t| async { vec![1] }, |_i, _b| async { true }).await;
        assert_eq!(played, 0);
    }
}

// Copyright 2026 The Blackboard Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end scenarios exercising the public API across buffer modes.

use std::time::Duration;

use blackboard::Blackboard;
use blackboard::BufferMode;
use blackboard::ChangeEntry;
use blackboard::ChangeSet;
use blackboard::Config;

fn config(mode: BufferMode, initial_len: usize) -> Config {
    Config {
        initial_len,
        buffer_mode: mode,
        ..Config::default()
    }
}

/// Scenario A — basic writer/reader, multi-buffered.
#[tokio::test]
async fn scenario_a_basic_writer_reader_multi_buffered() {
    let bb: Blackboard<f64> = Blackboard::new("a", config(BufferMode::MultiBuffered, 20)).unwrap();

    for k in 0..10 {
        let before = bb.revision();
        let mut w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
        for i in 0..10 {
            w[i] = k as f64;
        }
        w.commit();
        assert_eq!(bb.revision().value(), before.value() + 1);

        let r = bb.read_lock(Duration::from_secs(1)).await.unwrap();
        for i in 0..10 {
            assert_eq!(r[i], k as f64);
        }
        for i in 10..20 {
            assert_eq!(r[i], 0.0);
        }
    }
}

/// Scenario B — asynchronous change interleaved with a writer's publication.
#[tokio::test]
async fn scenario_b_asynchronous_change_interleaved() {
    let bb: Blackboard<f64> = Blackboard::new("b", config(BufferMode::MultiBuffered, 20)).unwrap();
    let k = 3.0;

    let mut w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
    for i in 0..10 {
        w[i] = k;
    }
    w.commit();

    bb.asynchronous_change(ChangeSet::new(vec![
        ChangeEntry::new(15, k),
        ChangeEntry::new(16, k + 1.0),
        ChangeEntry::new(17, k + 2.0),
    ]));

    let r = bb.read_lock(Duration::from_secs(1)).await.unwrap();
    for i in 0..10 {
        assert_eq!(r[i], k);
    }
    assert_eq!(r[15], k);
    assert_eq!(r[16], k + 1.0);
    assert_eq!(r[17], k + 2.0);
    for i in [10, 11, 12, 13, 14, 18, 19] {
        assert_eq!(r[i], 0.0);
    }
}

/// Scenario C — a deferred asynchronous change merges into the writer's own publication.
#[tokio::test]
async fn scenario_c_deferred_asynchronous_change() {
    let bb: Blackboard<i32> = Blackboard::new("c", config(BufferMode::MultiBuffered, 10)).unwrap();

    let w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
    let before = bb.revision();
    bb.asynchronous_change(ChangeSet::new(vec![ChangeEntry::new(5, 42)]));
    // Deferred: no publication happens while the write lock is held.
    assert_eq!(bb.revision().value(), before.value());
    w.commit();
    // Exactly one publication carries both the writer's (empty, in this case) edits and the
    // deferred change.
    assert_eq!(bb.revision().value(), before.value() + 1);

    let r = bb.read_lock(Duration::from_secs(1)).await.unwrap();
    assert_eq!(r[5], 42);
}

/// Scenario D — `SingleBuffered` blocking: a reader waits behind an exclusive writer and
/// resolves only once that writer unlocks.
#[tokio::test]
async fn scenario_d_single_buffered_blocking() {
    let bb: Blackboard<i32> = Blackboard::new("d", config(BufferMode::SingleBuffered, 20)).unwrap();

    let mut w = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
    for v in w.iter_mut() {
        *v = 9;
    }

    let reader_bb = bb.clone();
    let reader = tokio::spawn(async move { reader_bb.read_lock(Duration::from_millis(100)).await });

    // The reader must still be pending shortly after being issued.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!reader.is_finished());

    tokio::time::sleep(Duration::from_millis(30)).await;
    w.commit();

    let r = reader.await.unwrap().unwrap();
    assert!(r.iter().all(|v| *v == 9));
}

/// Scenario E — adaptive upgrade: the first read that would otherwise block behind an
/// exclusive writer upgrades the mode irreversibly, after which writes are always `OnCopy`
/// and reads never block again.
#[tokio::test]
async fn scenario_e_adaptive_upgrade() {
    let bb: Blackboard<i32> = Blackboard::new("e", config(BufferMode::MultiBufferedOnParallelAccess, 4)).unwrap();
    assert_eq!(bb.buffer_mode(), BufferMode::MultiBufferedOnParallelAccess);

    let w1 = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
    let reader_bb = bb.clone();
    let reader = tokio::spawn(async move { reader_bb.read_lock(Duration::from_millis(200)).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    w1.commit();
    reader.await.unwrap().unwrap();

    assert_eq!(bb.buffer_mode(), BufferMode::MultiBuffered);

    // A subsequent writer must not block a concurrent reader: the upgrade is permanent.
    let w2 = bb.write_lock(Duration::from_secs(1), false).await.unwrap();
    let r = bb.read_lock(Duration::from_millis(50)).await;
    assert!(r.is_ok(), "reads must never block once upgraded to MultiBuffered");
    w2.commit();
}

/// Scenario F — concurrent readers and writers over a short stress window: every call
/// resolves within its configured bound, and every snapshot a reader observes is an
/// uncorrupted, internally consistent arithmetic sequence `first_element + i`.
#[tokio::test]
async fn scenario_f_concurrent_pool_consistency() {
    let bb: Blackboard<i64> = Blackboard::new("f", config(BufferMode::MultiBuffered, 16)).unwrap();

    let mut writers = Vec::new();
    for _ in 0..3 {
        let bb = bb.clone();
        writers.push(tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + Duration::from_millis(300);
            let mut base: i64 = 0;
            while tokio::time::Instant::now() < deadline {
                if let Ok(mut w) = bb.write_lock(Duration::from_millis(50), false).await {
                    for (i, slot) in w.iter_mut().enumerate() {
                        *slot = base + i as i64;
                    }
                    w.commit();
                    base += 1;
                }
            }
        }));
    }

    let mut readers = Vec::new();
    for _ in 0..3 {
        let bb = bb.clone();
        readers.push(tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + Duration::from_millis(300);
            while tokio::time::Instant::now() < deadline {
                if let Ok(r) = bb.read_lock(Duration::from_millis(50)).await {
                    let first = r[0];
                    for (i, v) in r.iter().enumerate() {
                        assert_eq!(*v, first + i as i64, "reader observed a torn buffer");
                    }
                }
            }
        }));
    }

    for w in writers {
        w.await.unwrap();
    }
    for r in readers {
        r.await.unwrap();
    }
}

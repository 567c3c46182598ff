use anyhow::Result;
use std::cell::Cell;
use std::rc::Rc;
use tempfile::tempdir;
use ticktask::chime::Chime;
use ticktask::storage::{FileStore, KeyValueStore};
use ticktask::tasks::{Reply, TaskStore, TASKS_KEY};
use ticktask::timer::{Countdown, ManualClock, TimerState};

struct CountingChime(Rc<Cell<usize>>);

impl Chime for CountingChime {
    fn play(&self) -> Result<()> {
        self.0.set(self.0.get() + 1);
        Ok(())
    }
}

#[test]
fn task_mutations_survive_reload_from_disk() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join(".ticktask");

    let mut store = TaskStore::open(FileStore::new(&dir));
    let write_id = store.add("write report").expect("add").expect("id");
    let call_id = store.add("call plumber").expect("add").expect("id");
    let skip_id = store.add("water plants").expect("add").expect("id");
    assert_eq!(store.add("  ").expect("blank"), None);

    store.toggle_done(&write_id).expect("toggle");
    store
        .edit(&call_id, &mut Reply::text("call plumber at 9 "))
        .expect("edit");
    store.remove(&skip_id, &mut Reply::yes()).expect("remove");
    let expected = store.tasks().to_vec();

    let reloaded = TaskStore::open(FileStore::new(&dir));
    assert_eq!(reloaded.tasks(), expected.as_slice());
    let texts: Vec<_> = reloaded.tasks().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["call plumber at 9", "write report"]);
    assert!(reloaded.get(&write_id).expect("write").done);
}

#[test]
fn corrupt_slot_starts_empty_and_recovers_on_next_write() {
    let temp = tempdir().expect("tempdir");
    let mut backend = FileStore::new(temp.path());
    backend.set(TASKS_KEY, "::: not yaml [").expect("seed");

    let mut store = TaskStore::open(backend.clone());
    assert!(store.tasks().is_empty());
    store.add("fresh start").expect("add");

    let reloaded = TaskStore::open(backend);
    assert_eq!(reloaded.tasks().len(), 1);
    assert_eq!(reloaded.tasks()[0].text, "fresh start");
}

#[test]
fn one_minute_countdown_expires_once() {
    let clock = ManualClock::new(1_000);
    let plays = Rc::new(Cell::new(0));
    let mut timer = Countdown::new(clock.clone(), Box::new(CountingChime(plays.clone())), 1);

    timer.start();
    let mut now = 0;
    while now < 60_000 {
        clock.advance(16);
        now += 16;
        timer.on_frame();
    }

    assert_eq!(timer.state(), TimerState::Expired);
    assert_eq!(timer.display(), "00:00:000");
    assert!(!timer.wants_frame());
    assert_eq!(plays.get(), 1);
}

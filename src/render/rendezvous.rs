use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex, MutexGuard};

struct Turn<T> {
    pending: usize,
    granted: bool,
    closed: bool,
    data: T,
}

// Turn-taking between one worker thread and any number of callers. A caller
// registers as pending, waits until the worker grants it the turn, applies
// its command to `T` and hands the turn back. Once closed, every request is
// granted immediately.
pub struct Rendezvous<T> {
    turn: Mutex<Turn<T>>,
    changed: Condvar,
}

impl<T> Rendezvous<T> {
    pub fn new(data: T) -> Self {
        Self {
            turn: Mutex::new(Turn {
                pending: 0,
                granted: false,
                closed: false,
                data,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn request<R>(&self, command: impl FnOnce(&mut T) -> R) -> R {
        let mut turn = self.turn.lock();
        turn.pending += 1;
        self.changed.notify_all();
        while !turn.granted && !turn.closed {
            self.changed.wait(&mut turn);
        }
        turn.pending -= 1;

        let result = command(&mut turn.data);

        if !turn.closed {
            turn.granted = false;
        }
        self.changed.notify_all();
        result
    }

    // Direct access without taking a turn, for reads the worker tolerates at
    // any point between its own critical sections.
    pub fn with<R>(&self, read: impl FnOnce(&mut T) -> R) -> R {
        read(&mut self.turn.lock().data)
    }

    pub fn worker(&self) -> WorkerTurn<'_, T> {
        WorkerTurn {
            guard: self.turn.lock(),
            changed: &self.changed,
        }
    }
}

pub struct WorkerTurn<'a, T> {
    guard: MutexGuard<'a, Turn<T>>,
    changed: &'a Condvar,
}

impl<T> WorkerTurn<'_, T> {
    pub fn has_pending(&self) -> bool {
        self.guard.pending > 0
    }

    // Grants the turn to each pending caller in sequence and returns once
    // none are left.
    pub fn serve_pending(&mut self) -> usize {
        let mut served = 0;
        while self.guard.pending > 0 && !self.guard.closed {
            self.guard.granted = true;
            self.changed.notify_all();
            while self.guard.granted && !self.guard.closed {
                self.changed.wait(&mut self.guard);
            }
            served += 1;
        }
        served
    }

    pub fn wait_for_request(&mut self) {
        while self.guard.pending == 0 && !self.guard.closed {
            self.changed.wait(&mut self.guard);
        }
    }

    pub fn unlocked<R>(&mut self, work: impl FnOnce() -> R) -> R {
        MutexGuard::unlocked(&mut self.guard, work)
    }

    // Hands the lock straight to a thread blocked on it, if any, so callers
    // can register between slices of work done under the lock.
    pub fn yield_to_callers(&mut self) {
        MutexGuard::bump(&mut self.guard);
    }

    pub fn close(&mut self) {
        self.guard.closed = true;
        self.guard.granted = true;
        self.changed.notify_all();
    }
}

impl<T> Deref for WorkerTurn<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard.data
    }
}

impl<T> DerefMut for WorkerTurn<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard.data
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn request_waits_for_the_worker_to_grant_a_turn() {
        let rendezvous = Arc::new(Rendezvous::new(0u32));
        let (tx, rx) = mpsc::channel();
        let caller = {
            let rendezvous = Arc::clone(&rendezvous);
            thread::spawn(move || {
                let seen = rendezvous.request(|value| {
                    *value += 1;
                    *value
                });
                tx.send(seen).ok();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        let mut turn = rendezvous.worker();
        turn.wait_for_request();
        assert!(turn.has_pending());
        assert_eq!(turn.serve_pending(), 1);
        assert_eq!(*turn, 1);
        drop(turn);

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(1));
        caller.join().expect("caller thread");
    }

    #[test]
    fn many_callers_all_complete_while_the_worker_loops() {
        const CALLERS: usize = 8;
        const ROUNDS: usize = 50;

        let rendezvous = Arc::new(Rendezvous::new(0usize));
        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let rendezvous = Arc::clone(&rendezvous);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let mut turn = rendezvous.worker();
                    turn.serve_pending();
                    turn.unlocked(|| thread::sleep(Duration::from_micros(200)));
                }
                rendezvous.worker().close();
            })
        };

        let (tx, rx) = mpsc::channel();
        for _ in 0..CALLERS {
            let rendezvous = Arc::clone(&rendezvous);
            let tx = tx.clone();
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    rendezvous.request(|count| *count += 1);
                }
                tx.send(()).ok();
            });
        }
        for _ in 0..CALLERS {
            rx.recv_timeout(Duration::from_secs(10))
                .expect("caller finished without starving");
        }

        stop.store(true, Ordering::Relaxed);
        worker.join().expect("worker thread");
        assert_eq!(rendezvous.with(|count| *count), CALLERS * ROUNDS);
    }

    #[test]
    fn callers_get_in_while_the_worker_keeps_the_lock() {
        let rendezvous = Arc::new(Rendezvous::new(0usize));
        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let rendezvous = Arc::clone(&rendezvous);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut turn = rendezvous.worker();
                while !stop.load(Ordering::Relaxed) {
                    if turn.has_pending() {
                        turn.serve_pending();
                    }
                    *turn += 1;
                    turn.yield_to_callers();
                }
                turn.close();
            })
        };

        let (tx, rx) = mpsc::channel();
        let caller = {
            let rendezvous = Arc::clone(&rendezvous);
            thread::spawn(move || {
                let read = rendezvous.with(|count| *count);
                let requested = rendezvous.request(|count| *count);
                tx.send((read, requested)).ok();
            })
        };

        let (read, requested) = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("caller got a turn while the worker was busy");
        assert!(requested >= read);
        stop.store(true, Ordering::Relaxed);
        worker.join().expect("worker thread");
        caller.join().expect("caller thread");
    }

    #[test]
    fn closing_releases_current_and_future_callers() {
        let rendezvous = Arc::new(Rendezvous::new(()));
        let (tx, rx) = mpsc::channel();
        let caller = {
            let rendezvous = Arc::clone(&rendezvous);
            let tx = tx.clone();
            thread::spawn(move || {
                rendezvous.request(|_| ());
                tx.send(()).ok();
            })
        };
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        rendezvous.worker().close();
        rx.recv_timeout(Duration::from_secs(5)).expect("blocked caller released");
        caller.join().expect("caller thread");

        rendezvous.request(|_| ());
        rendezvous.request(|_| ());
    }
}

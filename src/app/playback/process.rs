use std::collections::{HashMap, VecDeque};
use std::process::{Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, Signal, System};
use tracing::{debug, warn};

use crate::error::PlaybackError;

/// The one player process a run may have alive, shared with the interrupt handler.
#[derive(Debug, Default)]
pub(crate) struct PlayerSlot {
    exiting: AtomicBool,
    child: Mutex<Option<u32>>,
}

impl PlayerSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Option<u32>> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `argv` in the foreground and waits for it. Refuses to start once cancelled.
    pub(crate) fn run(&self, argv: &[String]) -> Result<ExitStatus, PlaybackError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(PlaybackError::Launch {
                player: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        };

        let mut child = {
            let mut slot = self.lock();
            if self.is_exiting() {
                return Err(PlaybackError::Cancelled);
            }
            let child = ProcessCommand::new(program)
                .args(args)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|source| PlaybackError::Launch {
                    player: program.clone(),
                    source,
                })?;
            *slot = Some(child.id());
            child
        };

        let status = child.wait();
        *self.lock() = None;

        if self.is_exiting() {
            return Err(PlaybackError::Cancelled);
        }
        status.map_err(|source| PlaybackError::Wait {
            player: program.clone(),
            source,
        })
    }

    /// Terminates the running player and everything it spawned, then waits for them.
    ///
    /// Only the first call does anything; it returns `false` on every later call.
    pub(crate) fn cancel(&self) -> bool {
        if self.exiting.swap(true, Ordering::SeqCst) {
            return false;
        }

        let slot = self.lock();
        match *slot {
            Some(pid) => terminate_tree(pid),
            None => debug!("no player running"),
        }
        true
    }
}

fn descendants(system: &System, root: Pid) -> Vec<Pid> {
    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*pid);
        }
    }

    let mut found = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(pid) = queue.pop_front() {
        if let Some(kids) = children.get(&pid) {
            for kid in kids {
                found.push(*kid);
                queue.push_back(*kid);
            }
        }
    }
    found
}

fn terminate_tree(root_pid: u32) {
    let root = Pid::from_u32(root_pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    if system.process(root).is_none() {
        debug!(pid = root_pid, "player already ended");
        return;
    }

    // Deepest first, player last; once the player is gone its orphans get reaped by init.
    let mut tree = descendants(&system, root);
    tree.reverse();
    tree.push(root);

    for pid in &tree {
        if let Some(process) = system.process(*pid) {
            if process.kill_with(Signal::Term) != Some(true) {
                warn!(%pid, "failed to send SIGTERM");
            }
        }
    }

    for pid in tree.iter().rev() {
        debug!(%pid, "waiting for process to exit");
        wait_gone(&mut system, *pid);
    }
}

/// Zombies count as gone: the player is reaped by the thread that launched it, orphans by init.
fn wait_gone(system: &mut System, pid: Pid) {
    loop {
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        match system.process(pid) {
            Some(process) if process.status() != ProcessStatus::Zombie => {
                thread::sleep(Duration::from_millis(20));
            }
            _ => return,
        }
    }
}

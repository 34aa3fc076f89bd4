//! Console progress bars for the long passes.
//! The bar redraws itself in place on stderr and never touches the data
//! streams, so enabling it cannot change the transform output.

use std::time::{Duration,Instant};

const SEGMENTS: u64 = 20;
const EMIT_INTERVAL: Duration = Duration::from_millis(500);

/// Twenty segment percentage bar with rate limited updates.
pub struct Progress {
    title: &'static str,
    total: u64,
    enabled: bool,
    last_emit: Option<Instant>
}

impl Progress {
    pub fn new(title: &'static str,total: u64,enabled: bool) -> Self {
        Self {
            title,
            total,
            enabled,
            last_emit: None
        }
    }
    /// maybe redraw the bar, `pos` counts bytes already processed
    pub fn update(&mut self,pos: u64) {
        if !self.enabled {
            return;
        }
        let due = match self.last_emit {
            None => true,
            Some(t) => t.elapsed() >= EMIT_INTERVAL
        };
        if due {
            self.draw(self.percent(pos));
            self.last_emit = Some(Instant::now());
        }
    }
    /// draw the completed bar and drop to the next line
    pub fn finish(&mut self) {
        if self.enabled {
            self.draw(100);
            eprintln!();
        }
    }
    fn percent(&self,pos: u64) -> u64 {
        match self.total {
            0 => 100,
            total => 100*pos.min(total)/total
        }
    }
    fn draw(&self,percent: u64) {
        let filled = (percent/5).min(SEGMENTS) as usize;
        eprint!("\r{} [{}{}] {}%",self.title,"#".repeat(filled),"-".repeat(SEGMENTS as usize - filled),percent);
    }
}

#[test]
fn percent_is_clamped() {
    let bar = Progress::new("scan",200,false);
    assert_eq!(bar.percent(0),0);
    assert_eq!(bar.percent(100),50);
    assert_eq!(bar.percent(400),100);
    let empty = Progress::new("scan",0,false);
    assert_eq!(empty.percent(0),100);
}

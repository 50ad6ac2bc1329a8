use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::{Rc, Weak};

use futures_channel::oneshot;
use indexmap::IndexMap;

use crate::component::{ComponentId, Element};

/// Resolves once the batch that covers the matching request has finished.
pub type UpdateReceiver = oneshot::Receiver<()>;

/// How the scheduler asks its host for a future batch.
///
/// `request_frame` is called once each time the pending set goes from empty
/// to non-empty. The host answers by calling [`Scheduler::run_batch`] on a
/// later tick, never from inside `request_frame`.
pub trait FrameDriver {
    fn request_frame(&self);
}

/// A [`FrameDriver`] for hosts that pump batches themselves (tests, the
/// headless runtime): it only remembers that a frame was asked for.
#[derive(Debug, Default)]
pub struct ManualFrames {
    requested: Cell<bool>,
}

impl ManualFrames {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn is_requested(&self) -> bool {
        self.requested.get()
    }

    /// Clears and returns the request flag.
    pub fn take_request(&self) -> bool {
        self.requested.replace(false)
    }
}

impl FrameDriver for ManualFrames {
    fn request_frame(&self) {
        self.requested.set(true);
    }
}

/// Outcome of one [`Scheduler::run_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub updated: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Pending {
    elements: IndexMap<ComponentId, Weak<Element>>,
    waiters: Vec<oneshot::Sender<()>>,
}

/// Coalesces update requests into batches.
///
/// Any number of requests for the same element before the next batch result
/// in a single `update()`. A batch first updates every pending element, then
/// resolves all receivers handed out for it in request order. Requests made
/// while a batch is running go to the next batch. Cancelling an element the
/// running batch has not reached yet takes it out of that batch too.
///
/// ```rust,ignore
/// let frames = ManualFrames::new();
/// let scheduler = Scheduler::new(frames.clone());
/// let done = scheduler.request_update(&root);
/// if frames.take_request() {
///     scheduler.run_batch();
/// }
/// pollster::block_on(done).unwrap();
/// ```
pub struct Scheduler {
    driver: Rc<dyn FrameDriver>,
    pending: RefCell<Pending>,
    /// Elements of the batch in progress not yet updated.
    running: RefCell<IndexMap<ComponentId, Weak<Element>>>,
}

impl Scheduler {
    pub fn new(driver: Rc<dyn FrameDriver>) -> Self {
        Self { driver, pending: RefCell::new(Pending::default()), running: RefCell::default() }
    }

    /// Queues `element` for the next batch.
    pub fn request_update(&self, element: &Rc<Element>) -> UpdateReceiver {
        let (tx, rx) = oneshot::channel();
        let was_idle = {
            let mut pending = self.pending.borrow_mut();
            let was_idle = pending.elements.is_empty();
            pending.elements.entry(element.id()).or_insert_with(|| Rc::downgrade(element));
            pending.waiters.push(tx);
            was_idle
        };
        if was_idle {
            log::trace!("scheduler: requesting frame for {}", element.id());
            self.driver.request_frame();
        }
        rx
    }

    /// Drops `element` from the pending set and from the batch in progress,
    /// if it has not been updated yet. Receivers already handed out for it
    /// still resolve with their batch.
    pub fn cancel_update(&self, element: &Element) {
        let id = element.id();
        self.pending.borrow_mut().elements.shift_remove(&id);
        self.running.borrow_mut().shift_remove(&id);
    }

    pub fn is_idle(&self) -> bool {
        self.pending.borrow().elements.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().elements.len()
    }

    /// Runs one batch.
    ///
    /// A failing element is logged and counted; the rest of the batch still
    /// runs.
    pub fn run_batch(&self) -> BatchReport {
        let Pending { elements, waiters } = mem::take(&mut *self.pending.borrow_mut());
        *self.running.borrow_mut() = elements;
        let mut report = BatchReport::default();

        // Pop one at a time so updaters may cancel later entries.
        loop {
            let next = self.running.borrow_mut().shift_remove_index(0);
            let Some((id, element)) = next else { break };
            let Some(element) = element.upgrade() else {
                log::warn!("scheduler: skipping dropped element {}", id);
                continue;
            };
            match element.update() {
                Ok(()) => report.updated += 1,
                Err(err) => {
                    log::error!("scheduler: update of `{}` ({}) failed: {}", element.tag(), id, err);
                    report.failed += 1;
                }
            }
        }

        for waiter in waiters {
            // The caller may have dropped its receiver.
            let _ = waiter.send(());
        }

        log::debug!("scheduler: batch done ({} updated, {} failed)", report.updated, report.failed);
        report
    }

    /// Runs batches while `frames` has a request outstanding, at most
    /// `max_batches` times. Returns the number of batches run.
    pub fn pump(&self, frames: &ManualFrames, max_batches: usize) -> usize {
        let mut ran = 0;
        while ran < max_batches && frames.take_request() {
            self.run_batch();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use nabu_expr::ContextStack;

    use super::*;
    use crate::error::ViewError;
    use crate::headless::HeadlessComponent;
    use crate::tag::TagDescriptor;

    fn element() -> Rc<Element> {
        Element::new(TagDescriptor::parse("div").unwrap(), Box::new(HeadlessComponent::new("div")), ContextStack::new())
    }

    fn counting(element: &Element) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        element.set_updater(Box::new(move |_: &Element| {
            seen.set(seen.get() + 1);
            Ok(())
        }));
        count
    }

    fn setup() -> (Rc<ManualFrames>, Scheduler) {
        let frames = ManualFrames::new();
        let scheduler = Scheduler::new(frames.clone());
        (frames, scheduler)
    }

    #[test]
    fn repeated_requests_coalesce_into_one_update() {
        let (frames, scheduler) = setup();
        let el = element();
        let count = counting(&el);

        let mut first = scheduler.request_update(&el);
        let mut second = scheduler.request_update(&el);
        assert_eq!(scheduler.pending_len(), 1);
        assert!(frames.is_requested());

        // Nothing runs until the host pumps a frame.
        assert_eq!(count.get(), 0);
        assert_eq!(first.try_recv(), Ok(None));
        assert_eq!(second.try_recv(), Ok(None));

        assert!(frames.take_request());
        let report = scheduler.run_batch();
        assert_eq!(report, BatchReport { updated: 1, failed: 0 });
        assert_eq!(count.get(), 1);

        pollster::block_on(first).unwrap();
        pollster::block_on(second).unwrap();
        assert!(scheduler.is_idle());
    }

    #[test]
    fn frame_requested_once_per_batch() {
        let (frames, scheduler) = setup();
        let (a, b) = (element(), element());
        let _ = scheduler.request_update(&a);
        assert!(frames.take_request());
        let _ = scheduler.request_update(&b);
        assert!(!frames.is_requested());
        assert_eq!(scheduler.pending_len(), 2);
    }

    #[test]
    fn cancel_of_unqueued_element_is_harmless() {
        let (frames, scheduler) = setup();
        let (queued, stranger) = (element(), element());
        let queued_count = counting(&queued);
        let stranger_count = counting(&stranger);

        scheduler.cancel_update(&stranger);
        let done = scheduler.request_update(&queued);
        scheduler.cancel_update(&stranger);

        assert_eq!(scheduler.pump(&frames, 10), 1);
        assert_eq!(queued_count.get(), 1);
        assert_eq!(stranger_count.get(), 0);
        pollster::block_on(done).unwrap();
    }

    #[test]
    fn cancelled_element_is_skipped_but_receiver_resolves() {
        let (_, scheduler) = setup();
        let el = element();
        let count = counting(&el);
        let done = scheduler.request_update(&el);
        scheduler.cancel_update(&el);
        assert!(scheduler.is_idle());

        assert_eq!(scheduler.run_batch(), BatchReport::default());
        assert_eq!(count.get(), 0);
        pollster::block_on(done).unwrap();
    }

    #[test]
    fn cancel_during_a_batch_skips_later_element() {
        let (_, scheduler) = setup();
        let scheduler = Rc::new(scheduler);
        let (first, second) = (element(), element());
        let second_count = counting(&second);
        {
            let scheduler = Rc::downgrade(&scheduler);
            let target = Rc::downgrade(&second);
            first.set_updater(Box::new(move |_: &Element| {
                if let (Some(scheduler), Some(target)) = (scheduler.upgrade(), target.upgrade()) {
                    scheduler.cancel_update(&target);
                }
                Ok(())
            }));
        }

        let a = scheduler.request_update(&first);
        let b = scheduler.request_update(&second);
        assert_eq!(scheduler.run_batch(), BatchReport { updated: 1, failed: 0 });
        assert_eq!(second_count.get(), 0);
        pollster::block_on(a).unwrap();
        pollster::block_on(b).unwrap();
        assert!(scheduler.is_idle());
    }

    #[test]
    fn failure_does_not_abort_the_batch() {
        let (_, scheduler) = setup();
        let (bad, good) = (element(), element());
        bad.set_updater(Box::new(|_: &Element| Err(ViewError::RootCount { found: 0 })));
        let good_count = counting(&good);

        let a = scheduler.request_update(&bad);
        let b = scheduler.request_update(&good);
        let report = scheduler.run_batch();

        assert_eq!(report, BatchReport { updated: 1, failed: 1 });
        assert_eq!(good_count.get(), 1);
        pollster::block_on(a).unwrap();
        pollster::block_on(b).unwrap();
    }

    #[test]
    fn dropped_elements_are_skipped() {
        let (_, scheduler) = setup();
        let done = {
            let el = element();
            scheduler.request_update(&el)
        };
        assert_eq!(scheduler.run_batch(), BatchReport::default());
        pollster::block_on(done).unwrap();
    }

    #[test]
    fn requests_during_a_batch_go_to_the_next_one() {
        let (frames, scheduler) = setup();
        let scheduler = Rc::new(scheduler);
        let el = element();
        let count = Rc::new(Cell::new(0));
        let late: Rc<RefCell<Option<UpdateReceiver>>> = Rc::default();

        {
            let scheduler = Rc::downgrade(&scheduler);
            let target = Rc::downgrade(&el);
            let count = count.clone();
            let late = late.clone();
            el.set_updater(Box::new(move |_: &Element| {
                count.set(count.get() + 1);
                if count.get() == 1 {
                    if let (Some(scheduler), Some(target)) = (scheduler.upgrade(), target.upgrade()) {
                        *late.borrow_mut() = Some(scheduler.request_update(&target));
                    }
                }
                Ok(())
            }));
        }

        let first = scheduler.request_update(&el);
        assert!(frames.take_request());
        scheduler.run_batch();
        assert_eq!(count.get(), 1);
        pollster::block_on(first).unwrap();

        // The request made inside the batch asked for a new frame.
        let mut late = late.borrow_mut().take().unwrap();
        assert_eq!(late.try_recv(), Ok(None));
        assert_eq!(scheduler.pending_len(), 1);
        assert_eq!(scheduler.pump(&frames, 10), 1);
        assert_eq!(count.get(), 2);
        assert_eq!(late.try_recv(), Ok(Some(())));
    }

    #[test]
    fn pump_is_bounded() {
        let (frames, scheduler) = setup();
        let scheduler = Rc::new(scheduler);
        let el = element();
        {
            let scheduler = Rc::downgrade(&scheduler);
            let target = Rc::downgrade(&el);
            el.set_updater(Box::new(move |_: &Element| {
                if let (Some(scheduler), Some(target)) = (scheduler.upgrade(), target.upgrade()) {
                    let _ = scheduler.request_update(&target);
                }
                Ok(())
            }));
        }
        let _ = scheduler.request_update(&el);
        assert_eq!(scheduler.pump(&frames, 3), 3);
        assert!(!scheduler.is_idle());
    }
}

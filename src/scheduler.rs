//! Contains the [`Scheduler`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicPtr, AtomicU32, AtomicUsize, Ordering};

use crate::{
    Error, Stack, StackPusher, Task,
    fmt::{debug, info, trace},
    task::TaskEntryFn,
};

/// The location of our one and only [`Scheduler`] object.
///
/// We need this so that the free-standing PendSV handler knows where all our system state is.
pub(crate) static SCHEDULER_PTR: AtomicPtr<Scheduler> = AtomicPtr::new(core::ptr::null_mut());

/// Represents a Task
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskId(usize);

impl TaskId {
    /// Represents the Task ID we produce when the scheduler isn't running
    const INVALID_ID: usize = usize::MAX;

    /// Is this the invalid Task ID?
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID_ID
    }

    /// Create an invalid Task ID
    pub(crate) const fn invalid() -> TaskId {
        TaskId(Self::INVALID_ID)
    }

    /// The position of this task in the task table
    pub const fn index(self) -> usize {
        self.0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskId {
    fn format(&self, fmt: defmt::Formatter) {
        if self.is_invalid() {
            defmt::write!(fmt, "T---");
        } else {
            defmt::write!(fmt, "T{=usize:03}", self.0);
        }
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_invalid() {
            write!(fmt, "T---")
        } else {
            write!(fmt, "T{:03}", self.0)
        }
    }
}

/// A pre-emptive task-switching scheduler
///
/// On every tick it runs the highest priority task that is ready, taking
/// turns round-robin between tasks of equal priority. A task that calls
/// [`Scheduler::yield_until_tick`] sits out until the next tick.
///
/// The Arm hardware will push {xPSR, PC, LR, R12, R3, R2, R1, R0} to PSP when an
/// exception occurs. We then push the rest (EXC_RETURN, then R11 to R4).
#[repr(C)]
pub struct Scheduler {
    /// Which task is currently running
    current_task: AtomicUsize,
    /// Which task should PendSV switch to next
    next_task: AtomicUsize,
    /// A fixed, static table of task slots
    task_list: &'static [Task],
    /// Current tick count
    ticks: AtomicU32,
}

impl Scheduler {
    /// The offset, in bytes, to the `current_task` field
    pub(crate) const CURRENT_TASK_OFFSET: usize = core::mem::offset_of!(Scheduler, current_task);

    /// The offset, in bytes, to the `next_task` field
    pub(crate) const NEXT_TASK_OFFSET: usize = core::mem::offset_of!(Scheduler, next_task);

    /// The offset, in bytes, to the `tasks` field
    pub(crate) const TASK_LIST_OFFSET: usize = core::mem::offset_of!(Scheduler, task_list);

    /// This is the minimum stack we can support, because of the state we need to push
    ///
    /// Make space for seventeen 32-bit words in the task state, plus some
    /// headroom
    #[cfg(not(arm_abi = "eabihf"))]
    pub const MIN_STACK_SIZE: usize = (4 * 17) + 8;

    /// This is the minimum stack we can support, because of the state we need to push
    ///
    /// Make space for seventeen 32-bit words, thirty-two 32-bit FPU
    /// registers, plus FPU status register, in the task state, plus some
    /// headroom
    #[cfg(arm_abi = "eabihf")]
    pub const MIN_STACK_SIZE: usize = (4 * 50) + 8;

    /// Build the scheduler over a table of empty task slots
    pub const fn new(task_list: &'static [Task]) -> Scheduler {
        // Cannot schedule without at least one slot
        assert!(!task_list.is_empty());
        Scheduler {
            task_list,
            current_task: AtomicUsize::new(TaskId::INVALID_ID),
            next_task: AtomicUsize::new(0),
            ticks: AtomicU32::new(0),
        }
    }

    /// Create a task in the next free slot.
    ///
    /// The task starts in `entry`, which is passed `arg`. You can spawn
    /// before [`Scheduler::start`] or from a running task.
    ///
    /// Fails with [`Error::ResourceExhausted`] if every slot is taken, if
    /// the stack is too small to hold the saved task state, or if the stack
    /// already belongs to another task.
    pub fn spawn<T, const LEN: usize>(
        &self,
        name: &'static str,
        entry: TaskEntryFn<T>,
        arg: &'static T,
        stack: &'static Stack<LEN>,
        priority: u8,
    ) -> Result<TaskId, Error>
    where
        T: Sync,
    {
        if LEN < Self::MIN_STACK_SIZE {
            return Err(Error::ResourceExhausted);
        }

        let task_idx = critical_section::with(|cs| {
            self.task_list
                .iter()
                .position(|task| task.try_reserve(cs))
        })
        .ok_or(Error::ResourceExhausted)?;
        let task = &self.task_list[task_idx];

        if !stack.claim() {
            // hand the slot back
            task.release();
            return Err(Error::ResourceExhausted);
        }

        // SAFETY: we just claimed the stack, so nothing is running on it
        unsafe { stack.paint() };
        task.assign(name, stack.bottom(), LEN, priority);

        // SAFETY: `MIN_STACK_SIZE` leaves room for the initial frame
        let mut stack_pusher = unsafe { StackPusher::new(stack.top()) };
        stack_pusher.push_initial_frame(entry as usize, arg as *const T as usize);

        debug!(
            "Init task frame {=usize} '{=str}', with stack @ 0x{=usize:08x}",
            task_idx,
            name,
            stack_pusher.current() as usize
        );

        // SAFETY: the pointer we are passing is a validly aligned stack
        // pointer, with a full initial frame above it
        unsafe {
            task.set_stack(stack_pusher.current());
        }
        task.make_ready();

        Ok(TaskId(task_idx))
    }

    /// Run the scheduler
    ///
    /// You may only call this once, and you should call it from `fn main()`
    /// once all your hardware is configured and at least one task has been
    /// spawned. We should be in Privileged Thread mode on the Main stack.
    #[cfg(target_arch = "arm")]
    pub fn start(&self, mut syst: cortex_m::peripheral::SYST, systicks_per_sched_tick: u32) -> ! {
        if self.current_task.load(Ordering::SeqCst) != TaskId::INVALID_ID {
            panic!("Tried to re-start scheduler!");
        }

        // remember where this object is - it cannot move because we do not exit this function
        let self_addr = self as *const Scheduler as *mut Scheduler;
        info!("Scheduler @ {=usize:08x}", self_addr as usize);
        SCHEDULER_PTR.store(self_addr, Ordering::Release);

        let TaskSelection::NewTask(first) = self.pick_next_task() else {
            panic!("No tasks to run!");
        };
        self.next_task.store(first.0, Ordering::Relaxed);

        // Must do this /after/ setting SCHEDULER_PTR because the SysTick
        // exception handler will use SCHEDULER_PTR
        syst.set_reload(systicks_per_sched_tick);
        syst.set_clock_source(cortex_m::peripheral::syst::SystClkSource::Core);
        syst.clear_current();
        syst.enable_counter();
        syst.enable_interrupt();

        // Fire the PendSV exception - the PendSV handler will switch to the
        // task we picked
        debug!("Hit PendSV");
        crate::asm::request_task_switch();
        // impossible to get here
        unreachable!();
    }

    /// Call periodically, to get the scheduler to adjust which task should run next
    ///
    /// Ideally call this from a SysTick handler
    pub fn sched_tick(&self) {
        trace!("Tick!");
        for task in self.task_list.iter() {
            task.unpark();
        }

        self.ticks.fetch_add(1, Ordering::Relaxed);

        match self.pick_next_task() {
            TaskSelection::NewTask(task_id) => {
                self.next_task.store(task_id.0, Ordering::Relaxed);
                crate::asm::request_task_switch();
            }
            TaskSelection::CurrentTask | TaskSelection::NoTasks => {
                // nothing to do
            }
        }
    }

    /// Get current tick count
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Switch tasks, because this one has nothing to do until the next tick
    pub fn yield_until_tick(&self) {
        let task_id = self.current_task.load(Ordering::Relaxed);
        trace!("- yield_until_tick on T{=usize:03}", task_id);
        let Some(task) = self.task_list.get(task_id) else {
            return;
        };
        task.park();
        self.switch_away();
    }

    /// Stop the current task for good.
    ///
    /// Its slot is not reused; its stack stays readable for the high water
    /// mark.
    pub fn exit_current(&self) -> ! {
        let task_id = self.current_task_id();
        info!("Task {} exiting", task_id);
        if let Some(task) = self.task_list.get(task_id.0) {
            task.retire();
        }
        loop {
            self.switch_away();
        }
    }

    /// Hand the CPU to whichever task should run instead of the current one
    fn switch_away(&self) {
        match self.pick_next_task() {
            TaskSelection::NewTask(task_id) => {
                self.next_task.store(task_id.0, Ordering::Relaxed);
                crate::asm::request_task_switch();
            }
            TaskSelection::CurrentTask => {
                // a tick came in after we parked, so carry on
            }
            TaskSelection::NoTasks => {
                trace!("- Sleep!");
                crate::asm::wait_for_interrupt();
            }
        }
    }

    /// Get the current Task ID
    pub fn current_task_id(&self) -> TaskId {
        TaskId(self.current_task.load(Ordering::Relaxed))
    }

    /// Get the name a task was spawned with
    pub fn task_name(&self, task_id: TaskId) -> Option<&'static str> {
        self.task_list.get(task_id.0).map(Task::name)
    }

    /// Least free stack space a task has had, in bytes, since it was spawned
    pub fn stack_high_water_mark(&self, task_id: TaskId) -> Option<usize> {
        self.task_list
            .get(task_id.0)
            .and_then(Task::stack_high_water_mark)
    }

    /// Get the handler to the global scheduler
    pub(crate) fn get_scheduler() -> Option<&'static Scheduler> {
        // Get our stashed pointer
        let scheduler_ptr = SCHEDULER_PTR.load(Ordering::Relaxed);
        // Are we intialised?
        if scheduler_ptr.is_null() {
            None
        } else {
            // SAFETY: Only [`Scheduler::start`] writes to [`SCHEDULER_PTR`] and it
            // always sets it to be a valid pointer to a [`Scheduler`] that does not
            // move.
            Some(unsafe { &*scheduler_ptr })
        }
    }

    /// Select the next task to run
    ///
    /// Picks the highest priority runnable task. Amongst equals, it starts
    /// looking at the task after the current one, so they take turns.
    ///
    /// Doesn't trigger a task switch. Store the result in `self.next_task`
    /// and set PendSV to do that.
    fn pick_next_task(&self) -> TaskSelection {
        trace!("> picking a task");
        let task_sel = critical_section::with(|_cs| {
            let current_task = self.current_task.load(Ordering::Relaxed);
            let num_tasks = self.task_list.len();
            // Before the first switch there is no current task, so act as if
            // the last slot was running and start from slot zero.
            let last = if current_task == TaskId::INVALID_ID {
                num_tasks - 1
            } else {
                current_task
            };
            let mut selected: Option<(usize, u8)> = None;
            for offset in 1..=num_tasks {
                let idx = (last + offset) % num_tasks;
                let task = &self.task_list[idx];
                if !task.is_runnable() {
                    continue;
                }
                let priority = task.priority();
                // strictly greater, so the first of equals wins
                if selected.is_none_or(|(_, best)| priority > best) {
                    selected = Some((idx, priority));
                }
            }

            match selected {
                Some((task_id, _)) if task_id == current_task => TaskSelection::CurrentTask,
                Some((task_id, _)) => TaskSelection::NewTask(TaskId(task_id)),
                None => TaskSelection::NoTasks,
            }
        });

        trace!("< picked {}", task_sel);
        task_sel
    }
}

/// Describes which task we picked
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum TaskSelection {
    /// We picked a new task - do a task switch
    NewTask(TaskId),
    /// We like the current task - no switch required
    CurrentTask,
    /// There are no tasks - you should probably sleep
    NoTasks,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table<const N: usize>() -> &'static [Task] {
        Box::leak(Box::new([const { Task::empty() }; N]))
    }

    fn stack<const LEN: usize>() -> &'static Stack<LEN> {
        Box::leak(Box::new(Stack::new()))
    }

    fn idle(_: &'static ()) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    fn spawn(scheduler: &Scheduler, name: &'static str, priority: u8) -> TaskId {
        scheduler
            .spawn(name, idle, &(), stack::<512>(), priority)
            .unwrap()
    }

    /// Pretend PendSV ran
    fn switch(scheduler: &Scheduler, selection: TaskSelection) -> TaskId {
        let TaskSelection::NewTask(task_id) = selection else {
            panic!("expected a switch, got {selection:?}");
        };
        scheduler.current_task.store(task_id.0, Ordering::Relaxed);
        task_id
    }

    #[test]
    fn spawn_fills_slots_in_order() {
        let scheduler = Scheduler::new(table::<3>());
        assert_eq!(spawn(&scheduler, "a", 5), TaskId(0));
        assert_eq!(spawn(&scheduler, "b", 5), TaskId(1));
        assert_eq!(scheduler.task_name(TaskId(1)), Some("b"));
    }

    #[test]
    fn spawn_into_full_table_fails() {
        let scheduler = Scheduler::new(table::<1>());
        spawn(&scheduler, "only", 1);
        let result = scheduler.spawn("extra", idle, &(), stack::<512>(), 1);
        assert_eq!(result, Err(Error::ResourceExhausted));
    }

    #[test]
    fn spawn_with_tiny_stack_fails() {
        let scheduler = Scheduler::new(table::<1>());
        let result = scheduler.spawn("tiny", idle, &(), stack::<16>(), 1);
        assert_eq!(result, Err(Error::ResourceExhausted));
        // the slot is still free
        spawn(&scheduler, "fits", 1);
    }

    #[test]
    fn stack_cannot_be_shared() {
        let scheduler = Scheduler::new(table::<2>());
        let shared = stack::<512>();
        scheduler.spawn("first", idle, &(), shared, 1).unwrap();
        let result = scheduler.spawn("second", idle, &(), shared, 1);
        assert_eq!(result, Err(Error::ResourceExhausted));
        // and the slot it tried to use can still be spawned into
        assert_eq!(spawn(&scheduler, "third", 1), TaskId(1));
    }

    #[test]
    fn fresh_task_has_only_used_its_initial_frame() {
        let scheduler = Scheduler::new(table::<1>());
        let task_id = spawn(&scheduler, "a", 1);
        assert_eq!(
            scheduler.stack_high_water_mark(task_id),
            Some(512 - 17 * 4)
        );
    }

    #[test]
    fn equal_priorities_take_turns() {
        let scheduler = Scheduler::new(table::<4>());
        spawn(&scheduler, "a", 5);
        spawn(&scheduler, "b", 5);
        spawn(&scheduler, "c", 5);

        assert_eq!(switch(&scheduler, scheduler.pick_next_task()), TaskId(0));
        assert_eq!(switch(&scheduler, scheduler.pick_next_task()), TaskId(1));
        assert_eq!(switch(&scheduler, scheduler.pick_next_task()), TaskId(2));
        assert_eq!(switch(&scheduler, scheduler.pick_next_task()), TaskId(0));
    }

    #[test]
    fn higher_priority_wins() {
        let scheduler = Scheduler::new(table::<3>());
        spawn(&scheduler, "low", 1);
        spawn(&scheduler, "high", 9);
        spawn(&scheduler, "mid", 5);

        assert_eq!(switch(&scheduler, scheduler.pick_next_task()), TaskId(1));
        assert_eq!(scheduler.pick_next_task(), TaskSelection::CurrentTask);

        // once it parks, the next one down gets a go
        scheduler.task_list[1].park();
        assert_eq!(switch(&scheduler, scheduler.pick_next_task()), TaskId(2));
    }

    #[test]
    fn parked_tasks_come_back_on_the_tick() {
        let scheduler = Scheduler::new(table::<2>());
        spawn(&scheduler, "a", 5);
        switch(&scheduler, scheduler.pick_next_task());
        scheduler.task_list[0].park();
        assert_eq!(scheduler.pick_next_task(), TaskSelection::NoTasks);

        scheduler.sched_tick();
        assert_eq!(scheduler.now(), 1);
        assert_eq!(scheduler.pick_next_task(), TaskSelection::CurrentTask);
    }

    #[test]
    fn exited_tasks_are_never_picked() {
        let scheduler = Scheduler::new(table::<2>());
        spawn(&scheduler, "a", 5);
        spawn(&scheduler, "b", 5);
        scheduler.task_list[0].retire();
        assert_eq!(switch(&scheduler, scheduler.pick_next_task()), TaskId(1));
        scheduler.sched_tick();
        assert_eq!(scheduler.pick_next_task(), TaskSelection::CurrentTask);
    }

    #[test]
    fn invalid_task_id_displays_dashes() {
        assert_eq!(format!("{}", TaskId::invalid()), "T---");
        assert_eq!(format!("{}", TaskId(7)), "T007");
    }
}

// End of File

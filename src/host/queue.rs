use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

/// Сколько элементов резервируется заранее; дальше очередь растёт по мере
/// заполнения.
const PREALLOC_LIMIT: usize = 64;

/// Ограниченная FIFO-очередь с ожиданием по таймауту.
///
/// Используется как очередь уведомлений подписчика: производитель ждёт
/// свободного места, потребитель ждёт элемента.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Создаёт очередь на `capacity` элементов.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT))),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Кладёт элемент в конец очереди, ожидая свободного места не дольше
    /// `wait`. Если место не освободилось, элемент возвращается в `Err`.
    pub fn push(
        &self,
        item: T,
        wait: Option<Duration>,
    ) -> Result<(), T> {
        let deadline = deadline_for(wait);
        let mut items = self.items.lock();

        while items.len() >= self.capacity {
            match deadline {
                Wait::Forever => self.not_full.wait(&mut items),
                Wait::Until(at) => {
                    if self.not_full.wait_until(&mut items, at).timed_out()
                        && items.len() >= self.capacity
                    {
                        return Err(item);
                    }
                }
            }
        }

        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Забирает элемент из начала очереди, ожидая его не дольше `wait`.
    pub fn pop(
        &self,
        wait: Option<Duration>,
    ) -> Option<T> {
        let deadline = deadline_for(wait);
        let mut items = self.items.lock();

        loop {
            if let Some(item) = items.pop_front() {
                drop(items);
                self.not_full.notify_one();
                return Some(item);
            }

            match deadline {
                Wait::Forever => self.not_empty.wait(&mut items),
                Wait::Until(at) => {
                    if self.not_empty.wait_until(&mut items, at).timed_out() && items.is_empty() {
                        return None;
                    }
                }
            }
        }
    }

    /// Количество элементов, ожидающих получения.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Clone, Copy)]
enum Wait {
    Forever,
    Until(Instant),
}

fn deadline_for(wait: Option<Duration>) -> Wait {
    // Переполнение `Instant` трактуется как бесконечное ожидание.
    match wait.and_then(|d| Instant::now().checked_add(d)) {
        Some(at) => Wait::Until(at),
        None => Wait::Forever,
    }
}

// 1-indexed binary max-heap over (node, priority). Index 0 holds an infinite
// sentinel so sift-up never has to check for the root.
pub struct PriorityFrontier {
    nodes: Vec<usize>,
    priorities: Vec<f64>,
    len: usize,
}

impl PriorityFrontier {
    pub fn new(capacity: usize) -> Self {
        let mut priorities = vec![0.0; capacity + 1];
        priorities[0] = f64::INFINITY;
        Self {
            nodes: vec![0; capacity + 1],
            priorities,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len() - 1
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn enqueue(&mut self, node: usize, priority: f64) {
        if self.len == self.capacity() {
            panic!(
                "priority frontier is full ({} entries); a node was enqueued twice in one epoch",
                self.capacity()
            );
        }

        self.len += 1;
        let mut index = self.len;
        while self.priorities[index / 2] < priority {
            let parent = index / 2;
            self.nodes[index] = self.nodes[parent];
            self.priorities[index] = self.priorities[parent];
            index = parent;
        }
        self.nodes[index] = node;
        self.priorities[index] = priority;
    }

    pub fn dequeue(&mut self) -> usize {
        self.dequeue_with_priority().0
    }

    pub fn dequeue_with_priority(&mut self) -> (usize, f64) {
        if self.len == 0 {
            panic!("dequeue from an empty priority frontier");
        }

        let top = (self.nodes[1], self.priorities[1]);
        let last_node = self.nodes[self.len];
        let last_priority = self.priorities[self.len];
        self.len -= 1;

        let mut index = 1;
        loop {
            let mut child = index * 2;
            if child > self.len {
                break;
            }
            // Ties descend toward the first child.
            if child < self.len && self.priorities[child + 1] > self.priorities[child] {
                child += 1;
            }
            if self.priorities[child] <= last_priority {
                break;
            }
            self.nodes[index] = self.nodes[child];
            self.priorities[index] = self.priorities[child];
            index = child;
        }
        self.nodes[index] = last_node;
        self.priorities[index] = last_priority;

        top
    }

    #[cfg(test)]
    fn holds_heap_invariant(&self) -> bool {
        (2..=self.len).all(|i| self.priorities[i / 2] >= self.priorities[i])
    }
}

/*
Copyright 2021 Jakub Lewandowski

This file is part of MOM6 Tools (m6tools).

MOM6 Tools (m6tools) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

MOM6 Tools (m6tools) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with MOM6 Tools (m6tools). If not, see https://www.gnu.org/licenses/.
*/

use crate::Float;

/// Single edit of topography: column `i`, row `j` and the new value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edit {
    pub i: usize,
    pub j: usize,
    pub value: Float,
}

/// Ordered list of topography edits.
///
/// Each cell is edited at most once, adding an edit to
/// a cell already in the list replaces the previous edit
/// and moves it to the end of the list.
///
/// The list also holds the "current" value, which is
/// used for edits added without explicit value.
#[derive(Clone, Debug, Default)]
pub struct Edits {
    new_value: Float,
    list: Vec<Edit>,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_val(&mut self, value: Float) {
        self.new_value = value;
    }

    pub fn add_to_val(&mut self, increment: Float) {
        self.new_value += increment;
    }

    pub fn get(&self) -> Float {
        self.new_value
    }

    /// New value recorded for the cell, if it was edited.
    pub fn get_edit(&self, i: usize, j: usize) -> Option<Float> {
        self.list
            .iter()
            .find(|e| e.i == i && e.j == j)
            .map(|e| e.value)
    }

    pub fn delete(&mut self, i: usize, j: usize) {
        self.list.retain(|e| !(e.i == i && e.j == j));
    }

    /// Adds edit with given value or with the current value when `None`.
    pub fn add(&mut self, i: usize, j: usize, value: Option<Float>) {
        self.delete(i, j);

        self.list.push(Edit {
            i,
            j,
            value: value.unwrap_or(self.new_value),
        });
    }

    pub fn pop(&mut self) -> Option<Edit> {
        self.list.pop()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Edit, Edits};

    #[test]
    fn readding_moves_to_end() {
        let mut edits = Edits::new();
        edits.add(1, 1, Some(10.0));
        edits.add(2, 3, Some(20.0));
        edits.add(1, 1, Some(30.0));

        let list: Vec<Edit> = edits.iter().copied().collect();
        assert_eq!(
            list,
            vec![
                Edit { i: 2, j: 3, value: 20.0 },
                Edit { i: 1, j: 1, value: 30.0 }
            ]
        );
    }

    #[test]
    fn current_value_used_by_default() {
        let mut edits = Edits::new();
        edits.set_val(-100.0);
        edits.add_to_val(-5.0);
        edits.add(4, 5, None);

        assert_eq!(edits.get(), -105.0);
        assert_eq!(edits.get_edit(4, 5), Some(-105.0));
        assert_eq!(edits.get_edit(5, 4), None);
    }

    #[test]
    fn delete_and_pop() {
        let mut edits = Edits::new();
        edits.add(0, 0, Some(1.0));
        edits.add(0, 1, Some(2.0));
        edits.add(0, 2, Some(3.0));

        edits.delete(0, 1);
        assert_eq!(edits.len(), 2);

        assert_eq!(edits.pop(), Some(Edit { i: 0, j: 2, value: 3.0 }));
        assert_eq!(edits.len(), 1);

        edits.pop();
        assert!(edits.is_empty());
        assert_eq!(edits.pop(), None);
    }
}

use crate::ops::Mapping;

/// Opaque tag a plugin uses to recognise its own decorations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecorationId(pub &'static str);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub id: DecorationId,
    side: i8,
}

impl Decoration {
    /// A zero-width marker at `pos`. Content inserted exactly at `pos` pushes
    /// the widget after it.
    pub fn widget(pos: usize, id: DecorationId) -> Self {
        Self {
            from: pos,
            to: pos,
            id,
            side: 0,
        }
    }

    fn map(&self, mapping: &Mapping) -> Option<Decoration> {
        let assoc = if self.side < 0 { -1 } else { 1 };
        let result = mapping.map_result(self.from, assoc);
        if result.deleted {
            return None;
        }
        Some(Decoration {
            from: result.pos,
            to: result.pos,
            ..self.clone()
        })
    }
}

/// Immutable collection of decorations; every operation returns a new set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    pub fn find(&self, predicate: impl Fn(&Decoration) -> bool) -> Vec<Decoration> {
        self.decorations
            .iter()
            .filter(|deco| predicate(deco))
            .cloned()
            .collect()
    }

    pub fn add(&self, decorations: impl IntoIterator<Item = Decoration>) -> Self {
        let mut next = self.decorations.clone();
        next.extend(decorations);
        next.sort_by_key(|deco| deco.from);
        Self { decorations: next }
    }

    pub fn remove(&self, decorations: &[Decoration]) -> Self {
        Self {
            decorations: self
                .decorations
                .iter()
                .filter(|deco| !decorations.contains(deco))
                .cloned()
                .collect(),
        }
    }

    /// Moves every decoration through `mapping`, dropping those whose
    /// position was deleted.
    pub fn map(&self, mapping: &Mapping) -> Self {
        Self {
            decorations: self
                .decorations
                .iter()
                .filter_map(|deco| deco.map(mapping))
                .collect(),
        }
    }
}

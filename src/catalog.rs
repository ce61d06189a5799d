//! Static catalog data: maps with their callouts, and gadgets.
//!
//! The catalog is compiled into the application. [`Catalog::builtin`] returns
//! the shipped dataset; tests and tools can build their own [`Catalog`] and
//! inject it into the store.

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;

use serde::{Deserialize, Serialize};

use crate::geom::Point;

/// Named label marking a notable location on a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callout {
    pub id: String,
    pub name: String,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Spawn positions for each side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Spawns {
    pub attacker: Vec<Point>,
    pub defender: Vec<Point>,
}

/// A playable map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Map {
    pub id: String,
    pub name: String,
    /// Background image URL.
    pub image: String,
    pub callouts: Vec<Callout>,
    pub spike_sites: Vec<Point>,
    pub spawns: Spawns,
}

impl Map {
    #[must_use]
    pub fn callout(&self, id: &str) -> Option<&Callout> {
        self.callouts.iter().find(|c| c.id == id)
    }
}

/// Gadget category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GadgetKind {
    Grenade,
    Utility,
    Healing,
    Tactical,
}

impl GadgetKind {
    pub const ALL: [Self; 4] = [Self::Grenade, Self::Utility, Self::Healing, Self::Tactical];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grenade => "grenade",
            Self::Utility => "utility",
            Self::Healing => "healing",
            Self::Tactical => "tactical",
        }
    }

    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

/// A placeable gadget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gadget {
    pub id: String,
    pub name: String,
    pub kind: GadgetKind,
    /// Icon image URL.
    pub image: String,
    pub description: String,
    /// Default effect duration in seconds; zero for instant gadgets.
    pub duration: u32,
    /// Whether users may change the duration.
    pub customizable: bool,
}

/// Maps and gadgets available to the board.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    pub maps: Vec<Map>,
    pub gadgets: Vec<Gadget>,
}

impl Catalog {
    /// The shipped dataset.
    #[must_use]
    pub fn builtin() -> Self {
        Self { maps: builtin_maps(), gadgets: builtin_gadgets() }
    }

    #[must_use]
    pub fn map(&self, id: &str) -> Option<&Map> {
        self.maps.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn gadget(&self, id: &str) -> Option<&Gadget> {
        self.gadgets.iter().find(|g| g.id == id)
    }

    pub fn gadgets_of_kind(&self, kind: GadgetKind) -> impl Iterator<Item = &Gadget> {
        self.gadgets.iter().filter(move |g| g.kind == kind)
    }
}

// =============================================================
// Built-in data
// =============================================================

/// Per-map layout: callout anchors (A site, B site, attacker spawn label,
/// defender spawn label) and the y-row plus first x of each spawn line.
struct MapLayout {
    id: &'static str,
    name: &'static str,
    image: &'static str,
    a_site: (f64, f64),
    b_site: (f64, f64),
    attack_label: (f64, f64),
    defend_label: (f64, f64),
    attack_row: (f64, f64),
    defend_row: (f64, f64),
}

const MAP_LAYOUTS: [MapLayout; 5] = [
    MapLayout {
        id: "hammer-fall",
        name: "Hammer Fall",
        image: "/maps/Hammer_Fall_29_-_Map_-_Ballistic.webp",
        a_site: (200.0, 150.0),
        b_site: (600.0, 400.0),
        attack_label: (125.0, 500.0),
        defend_label: (775.0, 50.0),
        attack_row: (50.0, 500.0),
        defend_row: (700.0, 50.0),
    },
    MapLayout {
        id: "skyline-10",
        name: "Skyline 10",
        image: "/maps/Skyline_10_-_Map_-_Ballistic.webp",
        a_site: (180.0, 120.0),
        b_site: (620.0, 380.0),
        attack_label: (130.0, 480.0),
        defend_label: (820.0, 30.0),
        attack_row: (30.0, 480.0),
        defend_row: (720.0, 30.0),
    },
    MapLayout {
        id: "storm-chaser-cove",
        name: "Storm Chaser Cove",
        image: "/maps/Storm_Chaser_Cove_29_-_Map_-_Ballistic.webp",
        a_site: (220.0, 140.0),
        b_site: (580.0, 420.0),
        attack_label: (140.0, 460.0),
        defend_label: (840.0, 40.0),
        attack_row: (40.0, 460.0),
        defend_row: (740.0, 40.0),
    },
    MapLayout {
        id: "k-zone-commons",
        name: "K-Zone Commons",
        image: "/maps/K-Zone_Commons_-_Map_-_Ballistic.webp",
        a_site: (190.0, 130.0),
        b_site: (610.0, 390.0),
        attack_label: (160.0, 490.0),
        defend_label: (810.0, 60.0),
        attack_row: (60.0, 490.0),
        defend_row: (710.0, 60.0),
    },
    MapLayout {
        id: "cinderwatch",
        name: "Cinderwatch",
        image: "/maps/Cinderwatch_-_Map_-_Ballistic.webp",
        a_site: (210.0, 160.0),
        b_site: (590.0, 410.0),
        attack_label: (170.0, 470.0),
        defend_label: (830.0, 70.0),
        attack_row: (70.0, 470.0),
        defend_row: (730.0, 70.0),
    },
];

/// Spacing between consecutive spawn points along a spawn row.
const SPAWN_SPACING: f64 = 50.0;

/// Players per side.
const SPAWNS_PER_SIDE: u32 = 5;

fn callout(id: &str, name: &str, (x, y): (f64, f64)) -> Callout {
    Callout { id: id.to_owned(), name: name.to_owned(), position: Point::new(x, y), description: None }
}

fn spawn_row((x0, y): (f64, f64)) -> Vec<Point> {
    (0..SPAWNS_PER_SIDE)
        .map(|i| Point::new(f64::from(i).mul_add(SPAWN_SPACING, x0), y))
        .collect()
}

fn builtin_maps() -> Vec<Map> {
    MAP_LAYOUTS
        .iter()
        .map(|l| Map {
            id: l.id.to_owned(),
            name: l.name.to_owned(),
            image: l.image.to_owned(),
            callouts: vec![
                callout("a-site", "A Site", l.a_site),
                callout("b-site", "B Site", l.b_site),
                callout("attack-respawn", "Attackers Spawn", l.attack_label),
                callout("def-respawn", "Defenders Spawn", l.defend_label),
            ],
            spike_sites: vec![Point::new(l.a_site.0, l.a_site.1), Point::new(l.b_site.0, l.b_site.1)],
            spawns: Spawns { attacker: spawn_row(l.attack_row), defender: spawn_row(l.defend_row) },
        })
        .collect()
}

fn gadget(
    id: &str,
    name: &str,
    kind: GadgetKind,
    image: &str,
    description: &str,
    duration: u32,
    customizable: bool,
) -> Gadget {
    Gadget {
        id: id.to_owned(),
        name: name.to_owned(),
        kind,
        image: image.to_owned(),
        description: description.to_owned(),
        duration,
        customizable,
    }
}

fn builtin_gadgets() -> Vec<Gadget> {
    use GadgetKind::{Grenade, Healing, Tactical, Utility};
    vec![
        gadget(
            "bubble-shield",
            "Bubble Shield",
            Utility,
            "/itens/Bubble_Shield_29_-_Item_-_Ballistic.webp",
            "Temporary protective dome",
            15,
            true,
        ),
        gadget(
            "fire-grenade",
            "Fire Grenade",
            Grenade,
            "/itens/Fire_Grenade_-_Item_-_Ballistic.webp",
            "Incendiary grenade dealing area damage",
            8,
            true,
        ),
        gadget(
            "flashbang",
            "Flashbang",
            Tactical,
            "/itens/Flashbang_-_Item_-_Ballistic.webp",
            "Blinds and deafens enemies",
            3,
            false,
        ),
        gadget(
            "frag-grenade",
            "Frag Grenade",
            Grenade,
            "/itens/Frag_Grenade_-_Item_-_Ballistic.webp",
            "Explosive grenade with area damage",
            0,
            false,
        ),
        gadget(
            "impulse-grenade",
            "Impulse Grenade",
            Utility,
            "/itens/Impulse_Grenade_29_-_Item_-_Ballistic.webp",
            "Pushes players and objects away",
            0,
            false,
        ),
        gadget(
            "med-mist-smoke",
            "Med-Mist Smoke Grenade",
            Healing,
            "/itens/Med-Mist_Smoke_Grenade_-_Item_-_Ballistic.webp",
            "Smoke that heals allies inside it",
            12,
            true,
        ),
        gadget(
            "overdrive",
            "Overdrive",
            Utility,
            "/itens/Overdrive_-_Item_-_Ballistic.webp",
            "Boosts movement and reload speed",
            10,
            true,
        ),
        gadget(
            "proximity-mine",
            "Proximity Mine",
            Tactical,
            "/itens/Proximity_Mine_-_Item_-_Ballistic.webp",
            "Explodes when enemies come close",
            60,
            true,
        ),
        gadget(
            "recon-grenade",
            "Recon Grenade",
            Tactical,
            "/itens/Recon_Grenade_-_Item_-_Ballistic.webp",
            "Reveals enemies in an area",
            8,
            true,
        ),
        gadget(
            "smoke-grenade",
            "Smoke Grenade",
            Utility,
            "/itens/Smoke_Grenade_-_Item_-_Ballistic.webp",
            "Smoke screen for cover",
            15,
            true,
        ),
    ]
}

use crate::models::Subject;

/// Built-in subject -> chapter -> topic catalogue. The planner, the test
/// planner and the dashboards all enumerate this rather than deriving
/// structure from stored records, matching the legacy application.
pub struct SyllabusChapter {
    pub chapter: &'static str,
    pub topics: &'static [&'static str],
}

const PHYSICS: &[SyllabusChapter] = &[
    SyllabusChapter {
        chapter: "Kinematics",
        topics: &["Motion", "Projectile Motion", "Relative Velocity"],
    },
    SyllabusChapter {
        chapter: "Laws of Motion",
        topics: &["Newton's Laws", "Friction", "Circular Motion"],
    },
    SyllabusChapter {
        chapter: "Work, Energy and Power",
        topics: &["Work-Energy Theorem", "Potential Energy", "Collisions"],
    },
    SyllabusChapter {
        chapter: "Thermodynamics",
        topics: &["First Law", "Heat Engines", "Entropy"],
    },
    SyllabusChapter {
        chapter: "Current Electricity",
        topics: &["Ohm's Law", "Kirchhoff's Laws", "Wheatstone Bridge"],
    },
    SyllabusChapter {
        chapter: "Ray Optics",
        topics: &["Reflection", "Refraction", "Optical Instruments"],
    },
    SyllabusChapter {
        chapter: "Semiconductors",
        topics: &["P-N Junction Diode", "Transistors", "Logic Gates"],
    },
];

const CHEMISTRY: &[SyllabusChapter] = &[
    SyllabusChapter {
        chapter: "Atomic Structure",
        topics: &["Bohr Model", "Quantum Numbers", "Electronic Configuration"],
    },
    SyllabusChapter {
        chapter: "Chemical Bonding",
        topics: &["VSEPR Theory", "Hybridisation", "Molecular Orbital Theory"],
    },
    SyllabusChapter {
        chapter: "Equilibrium",
        topics: &["Chemical Equilibrium", "Ionic Equilibrium", "Buffer Solutions"],
    },
    SyllabusChapter {
        chapter: "p-Block Elements",
        topics: &["Group 15 Elements", "Group 16 Elements", "Halogens"],
    },
    SyllabusChapter {
        chapter: "Organic Chemistry - Basic Principles",
        topics: &["Nomenclature", "Isomerism", "Reaction Mechanisms"],
    },
    SyllabusChapter {
        chapter: "Coordination Compounds",
        topics: &["Werner's Theory", "Crystal Field Theory", "Isomerism in Complexes"],
    },
];

const BIOLOGY: &[SyllabusChapter] = &[
    SyllabusChapter {
        chapter: "Cell Structure and Function",
        topics: &["Cell Organelles", "Cell Cycle", "Biomolecules"],
    },
    SyllabusChapter {
        chapter: "Genetics",
        topics: &["Mendelian Inheritance", "Molecular Basis of Inheritance", "Mutations"],
    },
    SyllabusChapter {
        chapter: "Human Physiology",
        topics: &["Digestion", "Circulation", "Neural Control"],
    },
    SyllabusChapter {
        chapter: "Plant Physiology",
        topics: &["Photosynthesis", "Respiration", "Plant Growth Regulators"],
    },
    SyllabusChapter {
        chapter: "Ecology",
        topics: &["Ecosystems", "Biodiversity", "Environmental Issues"],
    },
    SyllabusChapter {
        chapter: "Reproduction",
        topics: &["Human Reproduction", "Reproductive Health", "Flowering Plants"],
    },
];

pub fn chapters(subject: Subject) -> &'static [SyllabusChapter] {
    match subject {
        Subject::Physics => PHYSICS,
        Subject::Chemistry => CHEMISTRY,
        Subject::Biology => BIOLOGY,
    }
}

pub fn find_chapter(subject: Subject, chapter: &str) -> Option<&'static SyllabusChapter> {
    chapters(subject).iter().find(|c| c.chapter == chapter)
}

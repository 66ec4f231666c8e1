use std::fmt::{self, Write as _};

use ar_meshing_port::MeshSnapshot;

/// Writes a human-readable description of a snapshot: its header, then one line per
/// block descriptor.
///
/// `version` is the version implied by the snapshot's file name, if any.
pub fn write_inspection(
    out: &mut dyn fmt::Write,
    version: Option<u32>,
    snapshot: &MeshSnapshot,
) -> fmt::Result {
    let sizes = snapshot.sizes();
    match version {
        Some(version) => writeln!(out, "Mesh version:  {version}")?,
        None => writeln!(out, "Mesh version:  unknown")?,
    }
    writeln!(out, "Block size:    {} m", snapshot.block_size)?;
    writeln!(
        out,
        "Buffer slots:  {} block, {} vertex, {} face",
        sizes.block_ints, sizes.vertex_floats, sizes.face_ints
    )?;
    writeln!(
        out,
        "Totals:        {} blocks, {} vertices, {} triangles",
        sizes.block_count(),
        sizes.vertex_count(),
        sizes.face_count()
    )?;
    if sizes.block_ints % ar_meshing::INTS_PER_BLOCK != 0 {
        writeln!(
            out,
            "Warning:       {} trailing block slots do not form a descriptor",
            sizes.block_ints % ar_meshing::INTS_PER_BLOCK
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "{:>24} {:>9} {:>9} {:>8}",
        "block", "vertices", "faces", "version"
    )?;
    for descriptor in snapshot.descriptors() {
        writeln!(
            out,
            "{:>24} {:>9} {:>9} {:>8}",
            descriptor.coord.to_string(),
            descriptor.vertex_count,
            descriptor.face_count,
            descriptor.version
        )?;
    }
    Ok(())
}

/// [`write_inspection()`] into a new [`String`].
pub fn inspection_text(version: Option<u32>, snapshot: &MeshSnapshot) -> String {
    let mut text = String::new();
    write_inspection(&mut text, version, snapshot).expect("writing to a String cannot fail");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_meshing::testing::{BlockFixture, FixtureProducer};
    use pretty_assertions::assert_eq;

    #[test]
    fn inspection_lists_blocks() {
        let mut producer = FixtureProducer::new(0.5);
        producer.set_state(
            3,
            &[
                BlockFixture::fan([0, 0, 0], 4, 4),
                BlockFixture::fan([-1, 2, 30], 9, 3),
            ],
        );
        let (_, snapshot) = ar_meshing_port::capture_snapshot(&mut producer)
            .unwrap()
            .unwrap();

        let text = inspection_text(Some(3), &snapshot);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Mesh version:  3",
                "Block size:    0.5 m",
                "Buffer slots:  12 block, 42 vertex, 9 face",
                "Totals:        2 blocks, 7 vertices, 3 triangles",
                "",
                "                   block  vertices     faces  version",
                "                  b0,0,0         4         2        4",
                "                b-1,2,30         3         1        9",
            ]
        );
    }

    #[test]
    fn unknown_version() {
        let text = inspection_text(None, &MeshSnapshot::default());
        assert!(text.starts_with("Mesh version:  unknown\n"), "{text}");
    }
}

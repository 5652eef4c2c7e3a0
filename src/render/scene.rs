use cgmath::Point3;
use rand::{
    distributions::{Distribution, Uniform},
    SeedableRng,
};

use super::BBox;

/// Diffuse colour range used by the exporter for inner room volumes.
const ROOM_SPACE_MIN: [f32; 3] = [0.64, 0.819, 0.99];
const ROOM_SPACE_MAX: [f32; 3] = [0.65, 0.82, 1.0];

/// Decoded mesh as handed over by the loading collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct RawMesh {
    pub name: String,
    /// Flat `[x, y, z, ...]` in local space.
    pub positions: Vec<f64>,
    pub indices: Vec<u32>,
    pub color: Option<[f32; 3]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<f64>,
    pub indices: Vec<u32>,
    pub color: [f32; 3],
    pub visible: bool,
    pub bbox: BBox,
}

impl SceneMesh {
    pub fn new(name: &str, positions: Vec<f64>, indices: Vec<u32>, color: [f32; 3]) -> Self {
        let bbox = BBox::from_points(&positions);
        Self {
            name: name.to_owned(),
            positions,
            indices,
            color,
            visible: true,
            bbox,
        }
    }

    #[inline]
    pub fn point(&self, idx: u32) -> Point3<f64> {
        let start = idx as usize * 3;
        let p = &self.positions[start..(start + 3)];
        Point3::new(p[0], p[1], p[2])
    }

    /// Triangles whose indices all fall inside the position buffer.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        let n_points = (self.positions.len() / 3) as u32;
        self.indices
            .chunks_exact(3)
            .filter(move |f| f.iter().all(|idx| *idx < n_points))
            .map(|f| [self.point(f[0]), self.point(f[1]), self.point(f[2])])
    }

    pub fn is_room_space(&self) -> bool {
        (0..3).all(|i| self.color[i] >= ROOM_SPACE_MIN[i] && self.color[i] <= ROOM_SPACE_MAX[i])
    }
}

/// A text label pinned to a local-space position. Never pickable.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteLabel {
    pub name: String,
    pub text: String,
    pub position: Point3<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    meshes: Vec<SceneMesh>,
    notes: Vec<NoteLabel>,
    pub notes_visible: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            meshes: vec![],
            notes: vec![],
            notes_visible: true,
        }
    }
}

impl Scene {
    /// Builds a scene from decoded meshes. Meshes without a material colour
    /// get a random one.
    pub fn from_raw(raw: Vec<RawMesh>, hide_room_spaces: bool) -> Self {
        let mut rng = rand::rngs::SmallRng::from_entropy();
        let between = Uniform::from(0.0..1.0);
        let mut scene = Self::default();
        for mesh in raw {
            let color = mesh.color.unwrap_or_else(|| {
                [
                    between.sample(&mut rng),
                    between.sample(&mut rng),
                    between.sample(&mut rng),
                ]
            });
            let mut mesh = SceneMesh::new(&mesh.name, mesh.positions, mesh.indices, color);
            if hide_room_spaces && mesh.is_room_space() {
                mesh.visible = false;
            }
            scene.add_mesh(mesh);
        }
        scene
    }

    pub fn add_mesh(&mut self, mesh: SceneMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    #[inline]
    pub fn meshes(&self) -> &[SceneMesh] {
        &self.meshes
    }

    pub fn set_mesh_visible(&mut self, idx: usize, visible: bool) {
        if let Some(mesh) = self.meshes.get_mut(idx) {
            mesh.visible = visible;
        }
    }

    /// Extent of all geometry, hidden meshes included. Invalid for an empty scene.
    pub fn bbox(&self) -> BBox {
        let mut bbox = BBox::default();
        for mesh in self.meshes.iter().filter(|m| m.bbox.is_valid()) {
            bbox.merge_box(&mesh.bbox);
        }
        bbox
    }

    #[inline]
    pub fn notes(&self) -> &[NoteLabel] {
        &self.notes
    }

    /// Adds or replaces the note called `name`.
    pub fn insert_note(&mut self, name: String, text: String, position: Point3<f64>) {
        self.remove_note(&name);
        self.notes.push(NoteLabel {
            name,
            text,
            position,
        });
    }

    pub fn remove_note(&mut self, name: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.name != name);
        self.notes.len() != before
    }
}

/// Breaks `text` at spaces into lines of at most `max_len` non-space
/// characters. A single word longer than `max_len` keeps a line of its own.
pub fn wrap_label(text: &str, max_len: usize) -> String {
    let mut lines: Vec<Vec<&str>> = vec![];
    let mut line: Vec<&str> = vec![];
    let mut count = 0;
    for word in text.split(' ') {
        let len = word.chars().count();
        count += len;
        if count > max_len && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            count = len;
        }
        line.push(word);
    }
    lines.push(line);
    lines
        .iter()
        .map(|words| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(name: &str, offset: f64, color: Option<[f32; 3]>) -> RawMesh {
        RawMesh {
            name: name.to_owned(),
            positions: vec![
                offset, 0.0, 0.0, //
                offset + 1.0, 0.0, 0.0, //
                offset, 1.0, 2.0,
            ],
            indices: vec![0, 1, 2],
            color,
        }
    }

    #[test]
    fn scene_bbox_spans_every_mesh() {
        let scene = Scene::from_raw(
            vec![
                triangle("a", 0.0, Some([1.0, 0.0, 0.0])),
                triangle("b", 5.0, None),
            ],
            true,
        );
        let bbox = scene.bbox();
        assert_eq!(bbox.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max, Point3::new(6.0, 1.0, 2.0));
        assert_eq!(scene.meshes()[0].color, [1.0, 0.0, 0.0]);
        assert!(scene.meshes()[1].color.iter().all(|c| (0.0..1.0).contains(c)));
    }

    #[test]
    fn room_spaces_load_hidden_but_count_for_the_box() {
        let room = Some([0.645, 0.8195, 1.0]);
        let scene = Scene::from_raw(
            vec![triangle("wall", 0.0, None), triangle("room", 10.0, room)],
            true,
        );
        assert!(scene.meshes()[0].visible);
        assert!(!scene.meshes()[1].visible);
        assert_eq!(scene.bbox().max.x, 11.0);

        let scene = Scene::from_raw(vec![triangle("room", 10.0, room)], false);
        assert!(scene.meshes()[0].visible);
    }

    #[test]
    fn empty_scene_has_no_box() {
        assert!(!Scene::default().bbox().is_valid());
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let mut mesh = SceneMesh::new("bad", vec![0.0; 9], vec![0, 1, 2, 0, 1, 7], [0.0; 3]);
        assert_eq!(mesh.triangles().count(), 1);
        mesh.indices.push(1);
        assert_eq!(mesh.triangles().count(), 1);
    }

    #[test]
    fn notes_are_replaced_by_name() {
        let mut scene = Scene::default();
        scene.insert_note("1_0".into(), "valve".into(), Point3::new(1.0, 2.0, 3.0));
        scene.insert_note("1_0".into(), "pump".into(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(scene.notes().len(), 1);
        assert_eq!(scene.notes()[0].text, "pump");
        assert!(scene.remove_note("1_0"));
        assert!(!scene.remove_note("1_0"));
    }

    #[test]
    fn labels_wrap_at_word_boundaries() {
        assert_eq!(wrap_label("short", 20), "short");
        assert_eq!(
            wrap_label("check the flange bolts on the north pump", 20),
            "check the flange bolts\non the north pump"
        );
        assert_eq!(wrap_label("averyveryverylongword here", 5), "averyveryverylongword\nhere");
    }
}

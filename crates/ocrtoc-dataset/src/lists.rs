use std::{
    collections::{BTreeSet, HashMap},
    fs,
    io::Write,
    path::Path,
};

use crate::error::DatasetError;

/// File under the dataset root listing the scene names.
pub const SCENE_NAME_LIST_FILE: &str = "scene_name_list.txt";

/// File under the dataset root listing the object names.
pub const OBJECT_NAME_LIST_FILE: &str = "object_name_list.txt";

/// File under a scene folder listing the objects placed in the scene.
pub const SCENE_OBJECT_LIST_FILE: &str = "object_list.txt";

/// Directory under the dataset root holding one folder per scene.
pub const SCENES_DIR: &str = "scenes";

/// Read a list of names, one per line.
///
/// Lines are trimmed. Blank lines between names are kept as empty entries so
/// that the position of every name, and thus its id, matches its line.
pub fn read_name_list(path: impl AsRef<Path>) -> Result<Vec<String>, std::io::Error> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::trim).map(String::from).collect())
}

/// Write a list of names, one per line.
pub fn write_name_list(path: impl AsRef<Path>, names: &[String]) -> Result<(), std::io::Error> {
    let mut file = std::io::BufWriter::new(fs::File::create(path)?);
    for name in names {
        writeln!(file, "{name}")?;
    }
    file.flush()
}

/// The dataset objects with their instance ids.
///
/// Ids start at 1 and follow the list order; 0 is the background of the
/// segmentation masks. A name listed twice takes the id of its last line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectList {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl ObjectList {
    /// Create the object list, assigning ids `1..=N` in order.
    pub fn new(names: Vec<String>) -> Self {
        let mut ids = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            ids.insert(name.clone(), i as u32 + 1);
        }
        Self { names, ids }
    }

    /// The object names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The name to id mapping.
    pub fn ids(&self) -> &HashMap<String, u32> {
        &self.ids
    }

    /// The id of an object, if it is known.
    pub fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// The number of objects.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no objects.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Read the objects placed in a scene.
pub fn load_scene_object_list(
    root: impl AsRef<Path>,
    scene_name: &str,
) -> Result<Vec<String>, DatasetError> {
    let path = root
        .as_ref()
        .join(SCENES_DIR)
        .join(scene_name)
        .join(SCENE_OBJECT_LIST_FILE);
    Ok(read_name_list(path)?)
}

/// Load the scene names of the dataset.
///
/// Reads [`SCENE_NAME_LIST_FILE`] when it exists. Otherwise the names are the
/// folders under [`SCENES_DIR`], sorted, and are written to the list file when
/// `save` is true.
pub fn load_scene_name_list(
    root: impl AsRef<Path>,
    save: bool,
) -> Result<Vec<String>, DatasetError> {
    let root = root.as_ref();
    let list_path = root.join(SCENE_NAME_LIST_FILE);
    if list_path.exists() {
        return Ok(read_name_list(list_path)?);
    }

    log::warn!("No existed scene list, generate scene list from scenes");
    let mut scene_names = Vec::new();
    for entry in fs::read_dir(root.join(SCENES_DIR))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            scene_names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    scene_names.sort();

    if save {
        log::warn!("Save scene name list to dataset folder");
        write_name_list(&list_path, &scene_names)?;
    }

    Ok(scene_names)
}

/// Load the object names of the dataset with their ids.
///
/// Reads [`OBJECT_NAME_LIST_FILE`] when it exists. Otherwise the list is the
/// sorted union of the objects of every scene, and is written to the list file
/// when `save` is true.
pub fn load_object_list(
    root: impl AsRef<Path>,
    scene_names: &[String],
    save: bool,
) -> Result<ObjectList, DatasetError> {
    let root = root.as_ref();
    let list_path = root.join(OBJECT_NAME_LIST_FILE);
    if list_path.exists() {
        return Ok(ObjectList::new(read_name_list(list_path)?));
    }

    log::warn!("No existed object list, generate object list from scenes");
    let mut object_names = BTreeSet::new();
    for scene_name in scene_names {
        object_names.extend(load_scene_object_list(root, scene_name)?);
    }
    let object_names = object_names.into_iter().collect::<Vec<_>>();

    if save {
        log::warn!("Save object list to dataset folder");
        write_name_list(&list_path, &object_names)?;
    }

    Ok(ObjectList::new(object_names))
}

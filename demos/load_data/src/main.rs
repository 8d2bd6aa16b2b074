use argh::FromArgs;
use std::path::PathBuf;

use ocrtoc::dataset::{ColorOrder, Dataset};
use ocrtoc::k3d::{io::ply::write_ply_pointcloud, pointcloud::ColoredPointCloud};

#[derive(FromArgs)]
/// Load a scene of the dataset and show its point cloud
struct Args {
    /// path to the dataset root folder
    #[argh(option)]
    dataset_root: PathBuf,

    /// index of the scene
    #[argh(option, default = "0")]
    scene_id: usize,

    /// index of a frame; the whole scene is reconstructed when omitted
    #[argh(option)]
    image_id: Option<usize>,

    /// write the point cloud to this PLY file instead of the viewer
    #[argh(option)]
    output: Option<PathBuf>,

    /// log level: debug, info, warn or error
    #[argh(option, default = "String::from(\"warn\")")]
    log_level: String,
}

fn log_pointcloud(
    rec: &rerun::RecordingStream,
    entity: &str,
    pointcloud: &ColoredPointCloud,
) -> Result<(), Box<dyn std::error::Error>> {
    let points = pointcloud
        .points()
        .iter()
        .map(|p| rerun::Position3D::new(p[0] as f32, p[1] as f32, p[2] as f32))
        .collect::<Vec<_>>();

    let colors = pointcloud
        .colors()
        .iter()
        .map(|c| {
            let [r, g, b] = c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
            rerun::Color::from_rgb(r, g, b)
        })
        .collect::<Vec<_>>();

    rec.log(entity, &rerun::Points3D::new(points).with_colors(colors))?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    env_logger::Builder::new()
        .filter_level(args.log_level.parse()?)
        .init();

    let dataset = Dataset::open(&args.dataset_root)?;
    println!(
        "#scenes: {} #objects: {} #images: {}",
        dataset.scene_number(),
        dataset.object_number(),
        dataset.total_image_number()?
    );

    let scene_name = dataset.scene_name(args.scene_id)?.to_string();
    println!(
        "scene {scene_name}: {} images, objects {:?}",
        dataset.scene_image_number(args.scene_id)?,
        dataset.load_scene_object_list(args.scene_id)?
    );

    let pointcloud = match args.image_id {
        Some(image_id) => {
            let mut pointcloud = dataset.load_point_cloud(args.scene_id, image_id)?;
            pointcloud.transform(&dataset.load_camera_pose(args.scene_id, image_id)?);
            pointcloud
        }
        None => dataset.load_scene_point_cloud(args.scene_id)?,
    };
    println!("Loaded #{} points", pointcloud.len());

    if let Some(output) = args.output {
        write_ply_pointcloud(&output, &pointcloud)?;
        println!("Saved point cloud to {}", output.display());
        return Ok(());
    }

    // create a Rerun recording stream
    let rec = rerun::RecordingStreamBuilder::new("Dataset Loader").spawn()?;

    if let Some(image_id) = args.image_id {
        let image = dataset.load_raw_image(args.scene_id, image_id, ColorOrder::Rgb)?;
        rec.log(
            "image",
            &rerun::Image::from_elements(
                image.as_slice(),
                [image.width() as u32, image.height() as u32],
                rerun::ColorModel::RGB,
            ),
        )?;
    }

    log_pointcloud(&rec, &format!("{scene_name}/pointcloud"), &pointcloud)?;

    Ok(())
}

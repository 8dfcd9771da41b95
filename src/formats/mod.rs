/// Blender `.blend` custom-data layers.
pub mod blender;

/// glTF 2.0 buffers and accessors.
pub mod gltf;
